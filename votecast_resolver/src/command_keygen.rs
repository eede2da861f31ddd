use std::fs;
use std::path::Path;
use votecast::generate_keypair;

pub fn run(matches: &clap::ArgMatches) {
    let output = match matches.value_of("OUTPUT") {
        Some(output) => output,
        None => {
            eprintln!("votecast-resolver keygen: output directory required");
            std::process::exit(1);
        }
    };

    let (secret, public) = generate_keypair();

    let secret_path = Path::new(output).join("resolverSigningKey.hex");
    let public_path = Path::new(output).join("resolverPublicKey.hex");

    if let Err(e) = fs::write(&secret_path, hex::encode(secret.as_bytes())) {
        eprintln!(
            "votecast-resolver keygen: unable to write {}: {}",
            secret_path.display(),
            e
        );
        std::process::exit(1);
    }
    if let Err(e) = fs::write(&public_path, hex::encode(public.as_bytes())) {
        eprintln!(
            "votecast-resolver keygen: unable to write {}: {}",
            public_path.display(),
            e
        );
        std::process::exit(1);
    }

    println!("Signing key: {}", secret_path.display());
    println!("Public key:  {}", public_path.display());
}
