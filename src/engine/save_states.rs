use super::{
    config_engine::{SAVE_STATE_FILENAME_SCENE, SAVE_STATE_FILENAME_SETTINGS},
    scene::Scene,
    settings::RaytraceSettings,
};
use crate::{
    config::{PRECURSOR_BYTES, PRECURSOR_BYTE_COUNT},
    helper::more_errors::IoError,
};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ~~ Public ~~

/// Saves `scene` in `dir`, usually [`LOCAL_STORAGE_DIR`](super::config_engine::LOCAL_STORAGE_DIR)
pub fn save_state_scene(dir: &Path, scene: &Scene) -> Result<(), IoError> {
    save_state(dir, SAVE_STATE_FILENAME_SCENE, scene)
}

pub fn load_state_scene(dir: &Path) -> Result<Scene, IoError> {
    load_state(dir, SAVE_STATE_FILENAME_SCENE)
}

pub fn save_state_settings(dir: &Path, settings: &RaytraceSettings) -> Result<(), IoError> {
    save_state(dir, SAVE_STATE_FILENAME_SETTINGS, settings)
}

pub fn load_state_settings(dir: &Path) -> Result<RaytraceSettings, IoError> {
    load_state(dir, SAVE_STATE_FILENAME_SETTINGS)
}

/// Serializes `to_serialize` to `dir/file_name` behind the [`PRECURSOR_BYTES`] header. `dir` is
/// created if missing.
pub fn save_state(
    dir: &Path,
    file_name: &str,
    to_serialize: &impl Serialize,
) -> Result<(), IoError> {
    let encoded_bytes = bincode::serialize(to_serialize).map_err(IoError::SerializeFailed)?;
    save_state_bytes(dir, file_name, encoded_bytes)
}

pub fn load_state<T>(dir: &Path, file_name: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    let encoded_bytes = load_state_bytes(dir, file_name)?;
    bincode::deserialize::<T>(&encoded_bytes).map_err(IoError::DeserializeFailed)
}

// ~~ Private ~~

fn save_state_bytes(dir: &Path, file_name: &str, encoded_bytes: Vec<u8>) -> Result<(), IoError> {
    // prepend encoded bytes with engine info
    let mut write_bytes = Vec::with_capacity(PRECURSOR_BYTE_COUNT + encoded_bytes.len());
    write_bytes.extend_from_slice(PRECURSOR_BYTES);
    write_bytes.extend(encoded_bytes);

    let file_path = validated_file_path(dir, file_name)?;
    fs::write(&file_path, write_bytes)
        .map_err(|e| IoError::WriteFileFailed(path_string(&file_path), e))?;
    debug!("saved state to {}", file_path.display());
    Ok(())
}

fn load_state_bytes(dir: &Path, file_name: &str) -> Result<Vec<u8>, IoError> {
    let file_path = dir.join(file_name);
    let mut read_bytes = fs::read(&file_path)
        .map_err(|e| IoError::read_file_error(e, path_string(&file_path)))?;

    if !read_bytes.starts_with(PRECURSOR_BYTES) {
        let header_len = read_bytes.len().min(PRECURSOR_BYTE_COUNT);
        return Err(IoError::InvalidPrecursor {
            path: path_string(&file_path),
            found: read_bytes[..header_len].to_vec(),
        });
    }
    read_bytes.drain(..PRECURSOR_BYTE_COUNT);

    debug!("loaded state from {}", file_path.display());
    Ok(read_bytes)
}

/// Ensures containing directories exist, but not the actual file
fn validated_file_path(dir: &Path, file_name: &str) -> Result<PathBuf, IoError> {
    fs::create_dir_all(dir).map_err(|e| IoError::CreateDirectoryFailed(path_string(dir), e))?;
    Ok(dir.join(file_name))
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// ~~ Tests ~~
