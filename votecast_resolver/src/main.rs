use clap::{App, Arg, SubCommand};

mod command_keygen;
mod command_resolve;

fn main() {
    env_logger::init();

    let matches = App::new("VoteCast Dispute Resolver")
        .version("1.0")
        .about("Resolves confirmed-vote disputes from control-component extraction payloads")
        .subcommand(
            SubCommand::with_name("keygen")
                .about("Generate a resolver signing keypair")
                .arg(
                    Arg::with_name("OUTPUT")
                        .index(1)
                        .required(true)
                        .help("Output directory for the keypair files"),
                ),
        )
        .subcommand(
            SubCommand::with_name("resolve")
                .about("Run the three-stage consistency check and settle confirmed votes")
                .arg(
                    Arg::with_name("INPUT")
                        .index(1)
                        .required(true)
                        .help("Directory holding the per-node extraction payload files"),
                )
                .arg(
                    Arg::with_name("keys")
                        .long("keys")
                        .takes_value(true)
                        .required(true)
                        .help("Directory holding the node verification key files"),
                )
                .arg(
                    Arg::with_name("signing-key")
                        .long("signing-key")
                        .takes_value(true)
                        .required(true)
                        .help("Hex-encoded resolver signing key file"),
                )
                .arg(
                    Arg::with_name("quorum")
                        .long("quorum")
                        .takes_value(true)
                        .help("Accept this many identical confirmations instead of requiring unanimity"),
                )
                .arg(
                    Arg::with_name("out")
                        .long("out")
                        .takes_value(true)
                        .help("Output directory for the signed resolved-votes payload (defaults to INPUT)"),
                ),
        )
        .get_matches();

    if let Some(matches) = matches.subcommand_matches("keygen") {
        command_keygen::run(matches);
    }
    if let Some(matches) = matches.subcommand_matches("resolve") {
        command_resolve::run(matches);
    }
}
