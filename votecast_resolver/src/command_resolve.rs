use ed25519_dalek::{PublicKey, SecretKey};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use votecast::*;

pub fn run(matches: &clap::ArgMatches) {
    let input = matches.value_of("INPUT").unwrap();
    let keys_dir = matches.value_of("keys").unwrap();
    let signing_key_file = matches.value_of("signing-key").unwrap();

    let policy = match matches.value_of("quorum") {
        None => ConfirmationPolicy::Unanimous,
        Some(raw) => {
            let size: usize = raw.parse().unwrap_or_else(|_| {
                eprintln!("votecast-resolver resolve: invalid quorum: {}", raw);
                std::process::exit(1);
            });
            ConfirmationPolicy::quorum(size).unwrap_or_else(|e| {
                eprintln!("votecast-resolver resolve: {}", e);
                std::process::exit(1);
            })
        }
    };

    let signing_secret = read_signing_key(signing_key_file);
    let node_public_keys = read_node_public_keys(keys_dir);

    let mut event_payloads = Vec::new();
    let mut card_payloads = Vec::new();
    for &node_id in KNOWN_NODE_IDS.iter() {
        event_payloads.push(read_payload::<
            Signed<ControlComponentExtractedElectionEventPayload>,
        >(
            input, EXTRACTED_ELECTION_EVENT_FILE_PREFIX, node_id
        ));
        card_payloads.push(read_payload::<
            Signed<ControlComponentExtractedVerificationCardsPayload>,
        >(
            input, EXTRACTED_VERIFICATION_CARDS_FILE_PREFIX, node_id
        ));
    }
    for (signed, &node_id) in event_payloads.iter().zip(KNOWN_NODE_IDS.iter()) {
        check_claimed_node(signed.payload.node_id, node_id);
    }
    for (signed, &node_id) in card_payloads.iter().zip(KNOWN_NODE_IDS.iter()) {
        check_claimed_node(signed.payload.node_id, node_id);
    }

    let keystore = MemKeystore::new(signing_secret, node_public_keys);
    let resolver = DisputeResolver::new(keystore, policy);

    let resolved = resolver
        .resolve(&event_payloads, &card_payloads)
        .unwrap_or_else(|e| {
            eprintln!("votecast-resolver resolve: {}", e);
            std::process::exit(1);
        });
    let count = resolved.resolved_confirmed_votes.len();

    let signing_secret = read_signing_key(signing_key_file);
    let signed = Signed::sign(&signing_secret, resolved);
    let encoded = serde_json::to_string_pretty(&signed).unwrap_or_else(|e| {
        eprintln!("votecast-resolver resolve: unable to serialize output: {}", e);
        std::process::exit(1);
    });

    let out_dir = matches.value_of("out").unwrap_or(input);
    let out_path =
        Path::new(out_dir).join(format!("{}.json", RESOLVED_CONFIRMED_VOTES_FILE_PREFIX));
    if let Err(e) = fs::write(&out_path, encoded) {
        eprintln!(
            "votecast-resolver resolve: unable to write {}: {}",
            out_path.display(),
            e
        );
        std::process::exit(1);
    }

    println!("Resolved {} confirmed votes: {}", count, out_path.display());
}

fn read_payload<T: serde::de::DeserializeOwned>(dir: &str, prefix: &str, node_id: NodeId) -> T {
    let filename = payload_filename(prefix, node_id);
    if node_id_from_filename(&filename).is_err() {
        eprintln!("votecast-resolver resolve: malformed payload filename: {}", filename);
        std::process::exit(1);
    }
    let path = Path::new(dir).join(&filename);
    let bytes = fs::read(&path).unwrap_or_else(|e| {
        eprintln!(
            "votecast-resolver resolve: unable to read {}: {}",
            path.display(),
            e
        );
        std::process::exit(1);
    });
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        eprintln!(
            "votecast-resolver resolve: unable to parse {}: {}",
            path.display(),
            e
        );
        std::process::exit(1);
    })
}

fn check_claimed_node(claimed: NodeId, expected: NodeId) {
    if claimed != expected {
        eprintln!(
            "votecast-resolver resolve: payload file for node {} claims node {}",
            expected, claimed
        );
        std::process::exit(1);
    }
}

fn read_signing_key(filename: &str) -> SecretKey {
    let raw = fs::read_to_string(filename).unwrap_or_else(|e| {
        eprintln!(
            "votecast-resolver resolve: unable to read {}: {}",
            filename, e
        );
        std::process::exit(1);
    });
    let bytes = hex::decode(raw.trim()).unwrap_or_else(|_| {
        eprintln!("votecast-resolver resolve: {} is not a hex key", filename);
        std::process::exit(1);
    });
    SecretKey::from_bytes(&bytes).unwrap_or_else(|_| {
        eprintln!("votecast-resolver resolve: {} is not an ed25519 key", filename);
        std::process::exit(1);
    })
}

fn read_node_public_keys(dir: &str) -> HashMap<NodeId, PublicKey> {
    let mut keys = HashMap::new();
    for &node_id in KNOWN_NODE_IDS.iter() {
        let path = Path::new(dir).join(format!("nodePublicKey.{}.hex", node_id));
        let raw = fs::read_to_string(&path).unwrap_or_else(|e| {
            eprintln!(
                "votecast-resolver resolve: unable to read {}: {}",
                path.display(),
                e
            );
            std::process::exit(1);
        });
        let bytes = hex::decode(raw.trim()).unwrap_or_else(|_| {
            eprintln!(
                "votecast-resolver resolve: {} is not a hex key",
                path.display()
            );
            std::process::exit(1);
        });
        let public = PublicKey::from_bytes(&bytes).unwrap_or_else(|_| {
            eprintln!(
                "votecast-resolver resolve: {} is not an ed25519 key",
                path.display()
            );
            std::process::exit(1);
        });
        keys.insert(node_id, public);
    }
    keys
}
