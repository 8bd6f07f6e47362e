use std::path::{Path, PathBuf};

use figment::providers::Serialized;
use figment::{Figment, Jail};
use treehardlink::config::{Config, ConfigError};
use treehardlink::duplicates::GroupingStrategy;
use treehardlink::output::OutputFormat;
use treehardlink::scanner::RelativePathMode;

#[test]
fn test_config_load_defaults() {
    // Defaults only, without Env, so other tests can't interfere
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();

    assert_eq!(config.min_worthwhile_size_bytes, 10_240);
    assert_eq!(config.group_by, GroupingStrategy::SizePath);
    assert_eq!(config.stat_threads, 4);
}

#[test]
fn test_config_load_from_env() {
    Jail::expect_with(|jail| {
        jail.set_env("TREEHARDLINK_STAT_THREADS", "16");
        jail.set_env("TREEHARDLINK_FOLLOW_SYMLINKS", "true");
        jail.set_env("TREEHARDLINK_DATABASE_PATH", "/var/tmp/inv.sqlite3");

        let config: Config = Config::layered(&[]).extract()?;

        assert_eq!(config.stat_threads, 16);
        assert!(config.follow_symlinks);
        assert_eq!(config.database_path, PathBuf::from("/var/tmp/inv.sqlite3"));
        Ok(())
    });
}

#[test]
fn test_config_load_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
min_worthwhile_size_bytes = 1048576
group_by = "size"
relative_path_mode = "byte-slice"
skip_hidden = true
output = "none"
"#,
        )?;

        let config: Config = Config::layered(&[Path::new("config.toml")]).extract()?;

        assert_eq!(config.min_worthwhile_size_bytes, 1_048_576);
        assert_eq!(config.group_by, GroupingStrategy::Size);
        assert_eq!(config.relative_path_mode, RelativePathMode::ByteSlice);
        assert!(config.skip_hidden);
        assert_eq!(config.output, OutputFormat::None);
        // Unset keys keep their defaults
        assert_eq!(config.stat_threads, 4);
        Ok(())
    });
}

#[test]
fn test_env_beats_file() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "group_by = \"path\"\nstat_threads = 2")?;
        jail.set_env("TREEHARDLINK_GROUP_BY", "size");

        let config: Config = Config::layered(&[Path::new("config.toml")]).extract()?;

        assert_eq!(config.group_by, GroupingStrategy::Size);
        assert_eq!(config.stat_threads, 2);
        Ok(())
    });
}

#[test]
fn test_load_with_extra_file() {
    Jail::expect_with(|jail| {
        jail.create_file("extra.toml", "min_worthwhile_size_bytes = 1")?;

        let config = Config::load(Some(Path::new("extra.toml"))).unwrap();

        assert_eq!(config.min_worthwhile_size_bytes, 1);
        Ok(())
    });
}

#[test]
fn test_malformed_file_is_reported() {
    Jail::expect_with(|jail| {
        jail.create_file("broken.toml", "stat_threads = \"many\"")?;

        let err = Config::load(Some(Path::new("broken.toml"))).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid(_)));
        Ok(())
    });
}

#[test]
fn test_default_config_path_is_toml() {
    if let Some(path) = Config::default_config_path() {
        assert_eq!(path.file_name().unwrap(), "config.toml");
    }
}
