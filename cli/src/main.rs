mod ledger;
mod notes;

use std::env;

use aion_config::AionConfig;
use aion_privacy::DenominationTier;

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    match AionConfig::load() {
        Ok(config) => {
            let _ = AionConfig::set_global(config);
        }
        Err(e) => {
            eprintln!("❌ Error loading config: {:#}", e);
            std::process::exit(1);
        }
    }

    let cmd = &args[1];

    let result = match cmd.as_str() {
        "note" => {
            let tier = match args.get(2).map(|s| s.parse::<DenominationTier>()) {
                None => DenominationTier::Tier0,
                Some(Ok(tier)) => tier,
                Some(Err(_)) => {
                    eprintln!("❌ Error: tier must be 0, 1, 2 or 3");
                    std::process::exit(1);
                }
            };
            notes::generate(tier, args.get(3).map(String::as_str))
        }
        "commitment" => {
            if args.len() < 5 {
                println!("Usage: commitment <secret> <nullifier> <tier>");
                return;
            }
            notes::commitment(&args[2], &args[3], &args[4])
        }
        "verify-note" => {
            if args.len() < 3 {
                println!("Usage: verify-note <file>");
                return;
            }
            notes::verify_file(&args[2])
        }
        "root" => notes::root(&args[2..]),
        "proof" => {
            if args.len() < 4 {
                println!("Usage: proof <commitment> <leaf>...");
                println!("  commitment - Leaf to prove");
                println!("  leaf       - Ledger commitments in index order");
                return;
            }
            notes::proof(&args[2], &args[3..])
        }
        "check-hash" => {
            if args.len() < 3 {
                println!("Usage: check-hash <vectors.json>");
                return;
            }
            notes::check_hash(&args[2])
        }
        "status" => ledger::status().await,
        "sync" => ledger::sync().await,
        "diagnose" => ledger::diagnose().await,
        "config" => {
            print!("{}", AionConfig::generate_sample());
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        _ => {
            println!("❌ Unknown command: {}", cmd);
            println!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error running {}: {:#}", cmd, e);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("AION CLI - Shielded deposit notes and Merkle root tooling");
    println!();
    println!("USAGE:");
    println!("  aion <command> [args]");
    println!();
    println!("NOTE COMMANDS:");
    println!("  note [tier] [file]               Generate a note (tier 0-3, default 0)");
    println!("  commitment <s> <n> <tier>        Recompute commitment and nullifier hash");
    println!("  verify-note <file>               Check a saved note against its secrets");
    println!();
    println!("MERKLE COMMANDS:");
    println!("  root <leaf>...                   Root of the given leaves");
    println!("  proof <commitment> <leaf>...     Inclusion proof for one leaf");
    println!("  check-hash <vectors.json>        Compare the hasher with ledger vectors");
    println!();
    println!("LEDGER COMMANDS (ledger.backend = \"rpc\"):");
    println!("  status                           Computed vs recorded root");
    println!("  sync                             Run one synchronization pass");
    println!("  diagnose                         Find which hash variant the ledger used");
    println!();
    println!("OTHER COMMANDS:");
    println!("  config                           Print a sample config.toml");
    println!("  help                             Show this help message");
    println!();
    println!("TIERS:");
    for tier in DenominationTier::ALL {
        println!("  {}  {:>12} units  ({})", tier.index(), tier.units(), tier.label());
    }
    println!();
    println!("EXAMPLES:");
    println!("  aion note 2 my-note.json                 # 0.1 WBTC note, saved to file");
    println!("  aion root 0x1 0x2 0x3                    # Root of three leaves");
    println!("  aion proof 0x3 0x1 0x2 0x3               # Proof for the carried leaf");
    println!("  AION_LEDGER=rpc aion status              # Compare roots on the ledger");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("  AION_CONFIG          Config file path");
    println!("  AION_RPC_URL         Ledger JSON-RPC endpoint");
    println!("  AION_AUTH_TOKEN      Bearer token for root writes");
    println!("  AION_HASH_VARIANT    on-elements | unpadded");
    println!("  RUST_LOG             Log level (debug/info/warn/error)");
}
