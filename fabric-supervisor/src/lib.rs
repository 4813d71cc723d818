use std::path::PathBuf;
use std::time::Duration;

/// Default fabric size when `--nodes` is not given.
pub const DEFAULT_NODE_COUNT: u16 = 7;

/// First replica port; replica `i` (0-indexed) listens on `BASE_PORT + i`.
pub const BASE_PORT: u16 = 5001;

/// Port the orchestrator binds.
pub const ORCHESTRATOR_PORT: u16 = 6000;

/// How long a child is given to exit after a graceful terminate signal
/// before the supervisor force-kills it.
pub const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// The root directory under which every replica's storage file lives.
pub fn data_root() -> PathBuf {
    PathBuf::from("blockchain_data")
}

/// Replica `index` (0-indexed)'s data directory, 1-indexed on disk to match
/// the original network launcher's `node_<i+1>` naming.
pub fn node_dir(index: u16) -> PathBuf {
    data_root().join(format!("node_{}", index + 1))
}

/// Replica `index`'s ledger storage path.
pub fn storage_path(index: u16) -> PathBuf {
    node_dir(index).join("blockchain_dag.json")
}

/// Port replica `index` listens on.
pub fn replica_port(index: u16) -> u16 {
    BASE_PORT + index
}

/// Path to a sibling binary built alongside this one, honoring the
/// platform's executable suffix (e.g. `.exe` on Windows).
pub fn sibling_binary(name: &str) -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| anyhow::anyhow!("executable has no parent directory"))?;
    Ok(dir.join(format!("{name}{}", std::env::consts::EXE_SUFFIX)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replica_ports_are_contiguous_from_base() {
        assert_eq!(replica_port(0), 5001);
        assert_eq!(replica_port(6), 5007);
    }

    #[test]
    fn node_dirs_are_one_indexed() {
        assert_eq!(node_dir(0), PathBuf::from("blockchain_data/node_1"));
        assert_eq!(node_dir(6), PathBuf::from("blockchain_data/node_7"));
    }

    #[test]
    fn storage_path_sits_under_its_node_dir() {
        assert_eq!(
            storage_path(2),
            PathBuf::from("blockchain_data/node_3/blockchain_dag.json")
        );
    }
}
