//! This example decodes an advertisement payload given on the command line.

use bleprobe::{AdDecoder, AdvertisementPayload, Error, Report};

fn main() -> Result<(), Error> {
    pretty_env_logger::init();

    let hex = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "0201061AFF4C000215FDA50693A4E24FB1AFCFC6EB0764782527114C62C5".to_owned());

    let payload = AdvertisementPayload::from_hex(&hex)?;
    let decoded = AdDecoder::default().decode(&payload);

    println!("{}", Report::new(&payload, &decoded));

    if let Some(flags) = decoded.flags() {
        println!("\nInferred mode: {}", flags.inferred_mode());
    }

    Ok(())
}
