use anyhow::Result;

use crate::config::Config;
use crate::media::MediaKind;
use crate::store::ArtifactStore;

use super::args::ListCliArgs;

pub fn handle_list_command(args: ListCliArgs) -> Result<()> {
    let config = Config::load()?;
    let store = ArtifactStore::open(config.captures_dir()?, config.db_path()?)?;

    let kinds: Vec<MediaKind> = match args.kind.as_deref() {
        Some(kind) => vec![kind.parse()?],
        None => MediaKind::ALL.to_vec(),
    };

    for kind in kinds {
        let artifacts = store.list(kind, args.limit)?;

        if artifacts.is_empty() {
            println!("No {} artifacts found.", kind.as_str());
            continue;
        }

        println!("Found {} {} artifact(s):\n", artifacts.len(), kind.as_str());

        for artifact in artifacts {
            let created_at = artifact.created_at.as_deref().unwrap_or("Unknown");
            println!("Name: {}", artifact.filename);
            println!("Date: {}", created_at);
            println!("Size: {} bytes", artifact.size_bytes);
            println!("Path: {}", artifact.path);
            println!("---");
        }
    }

    Ok(())
}
