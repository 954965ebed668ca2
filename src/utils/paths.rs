use std::path::PathBuf;

const NAME_MAP_FILE: &str = "names.json";

pub fn medlookup_config_dir() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("medlookup"),
        None => std::env::temp_dir().join("medlookup"),
    }
}

/// Default location of the user's name-map override file.
pub fn default_name_map_path() -> PathBuf {
    medlookup_config_dir().join(NAME_MAP_FILE)
}
