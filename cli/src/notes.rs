//! Offline note and Merkle commands. Nothing here touches the ledger.

use std::io::Write;
use std::{fs, fs::OpenOptions};

use aion_config::AionConfig;
use aion_core::config::build_hasher;
use aion_privacy::{
    DenominationTier, FieldElement, FieldHasher, MerkleEngine, NoteEngine, PoseidonHasher,
    PrivateNote, check_conformance, load_vectors, note_key,
};
use anyhow::{Context, Result, bail};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

fn hasher() -> PoseidonHasher {
    build_hasher(&AionConfig::global().hash)
}

fn parse_leaves(raw: &[String]) -> Result<Vec<FieldElement>> {
    raw.iter()
        .map(|s| FieldElement::from_hex(s).with_context(|| format!("invalid leaf {s}")))
        .collect()
}

pub fn generate(tier: DenominationTier, file: Option<&str>) -> Result<()> {
    let engine = NoteEngine::new(hasher());
    let note = engine.generate_note(tier)?;
    let json = serde_json::to_string_pretty(&note)?;

    println!("🔐 Generated {} note ({} units)", tier.label(), tier.units());
    println!("   key            : {}", note.key());
    println!("   commitment     : {}", note.commitment);
    println!("   nullifierHash  : {}", note.nullifier_hash);

    match file {
        Some(path) => {
            let mut f = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .with_context(|| format!("{path} already exists or cannot be created"))?;

            #[cfg(unix)]
            {
                // chmod 600 (rw-------)
                let mut perms = f.metadata()?.permissions();
                perms.set_mode(0o600);
                fs::set_permissions(path, perms)?;
            }

            f.write_all(json.as_bytes())?;
            println!("✅ Wrote note to {}", path);
            println!("⚠️  Anyone holding this file can withdraw the deposit");
        }
        None => println!("{json}"),
    }

    Ok(())
}

pub fn commitment(secret: &str, nullifier: &str, tier: &str) -> Result<()> {
    let secret = FieldElement::from_hex(secret).context("invalid secret")?;
    let nullifier = FieldElement::from_hex(nullifier).context("invalid nullifier")?;
    let tier: DenominationTier = tier.parse()?;

    let engine = NoteEngine::new(hasher());
    let commitment = engine.recompute_commitment(&secret, &nullifier, tier);

    println!("commitment     : {}", commitment);
    println!("nullifierHash  : {}", engine.nullifier_hash(&nullifier));
    println!("key            : {}", note_key(&commitment));
    Ok(())
}

pub fn verify_file(path: &str) -> Result<()> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let note = PrivateNote::from_json(&raw).context("not a note file")?;

    NoteEngine::new(hasher()).verify_note(&note)?;
    println!("✅ Note {} is consistent ({})", note.key(), note.tier.label());
    Ok(())
}

pub fn root(raw: &[String]) -> Result<()> {
    let leaves = parse_leaves(raw)?;
    let root = MerkleEngine::new(hasher()).root(&leaves);
    println!("leaves : {}", leaves.len());
    println!("root   : {}", root);
    Ok(())
}

pub fn proof(target: &str, raw: &[String]) -> Result<()> {
    let target = FieldElement::from_hex(target).context("invalid commitment")?;
    let leaves = parse_leaves(raw)?;

    let engine = MerkleEngine::new(hasher());
    let tree = engine.tree(&leaves);
    let proof = tree.proof_for(&target)?;

    if !engine.verify(&target, &proof.siblings, &tree.root()) {
        bail!("proof for {target} does not verify against its own root");
    }

    println!("root : {}", tree.root());
    println!("{}", serde_json::to_string_pretty(&proof)?);
    Ok(())
}

pub fn check_hash(path: &str) -> Result<()> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let vectors = load_vectors(&raw)?;
    let hasher = hasher();

    check_conformance(&hasher, &vectors)
        .with_context(|| format!("{} disagrees with the ledger", hasher.name()))?;
    println!("✅ {} matches all {} vectors", hasher.name(), vectors.len());
    Ok(())
}
