use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Backend, CopyPath, FramelinkConfig};
use crate::paths::ENV_CONFIG;

#[derive(Parser, Debug)]
#[command(
    name = "framelink",
    author,
    version,
    about = "Receive shared GPU texture frames from a named server"
)]
pub struct Cli {
    /// Configuration file (defaults to framelink.toml in the user config directory).
    #[arg(long, global = true, value_name = "FILE", env = ENV_CONFIG)]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default, Clone)]
pub struct RunArgs {
    /// Server or application name to receive from.
    #[arg(long, value_name = "NAME")]
    pub server: Option<String>,

    /// Copy path: `gpu` (render target) or `cpu` (ARGB image).
    #[arg(long, value_name = "PATH", value_parser = parse_copy_path)]
    pub path: Option<CopyPath>,

    /// Render host: `wgpu` or `software`.
    #[arg(long, value_name = "BACKEND", value_parser = parse_backend)]
    pub backend: Option<Backend>,

    /// Stop after receiving this many frames.
    #[arg(long, value_name = "N")]
    pub frames: Option<u64>,

    /// Size of the built-in test pattern (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Write the last received frame as PNG to this file or directory.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,
}

impl RunArgs {
    /// Overlays flags on top of file configuration.
    pub fn apply(&self, config: &mut FramelinkConfig) {
        if let Some(server) = &self.server {
            config.receiver.server = Some(server.clone());
        }
        if let Some(path) = self.path {
            config.receiver.path = path;
        }
        if let Some(backend) = self.backend {
            config.receiver.backend = backend;
        }
        if let Some(frames) = self.frames {
            config.receiver.frames = frames;
        }
        if let Some((width, height)) = self.size {
            config.producer.width = width;
            config.producer.height = height;
        }
        if let Some(export) = &self.export {
            config.export.path = Some(export.clone());
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Receive frames (the default when no subcommand is given).
    Run(RunArgs),
    /// List announced servers.
    List,
    /// Print the description of one server.
    Describe {
        /// Server or application name.
        name: String,
        /// Emit JSON instead of `key: value` lines.
        #[arg(long)]
        json: bool,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_copy_path(value: &str) -> Result<CopyPath, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "gpu" | "surface" => Ok(CopyPath::Gpu),
        "cpu" | "image" => Ok(CopyPath::Cpu),
        "" => Err("copy path must not be empty".to_string()),
        other => Err(format!("unknown copy path '{other}'; expected gpu or cpu")),
    }
}

pub fn parse_backend(value: &str) -> Result<Backend, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "wgpu" | "gpu" => Ok(Backend::Wgpu),
        "software" | "cpu" => Ok(Backend::Software),
        "" => Err("backend must not be empty".to_string()),
        other => Err(format!("unknown backend '{other}'; expected wgpu or software")),
    }
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{w}'"))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{h}'"))?;
    if width == 0 || height == 0 {
        return Err("size must be greater than zero".into());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("1280x720"), Ok((1280, 720)));
        assert_eq!(parse_size(" 64X32 "), Ok((64, 32)));
        assert!(parse_size("1280").is_err());
        assert!(parse_size("0x10").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn parses_enums_case_insensitively() {
        assert_eq!(parse_copy_path("CPU"), Ok(CopyPath::Cpu));
        assert_eq!(parse_copy_path("surface"), Ok(CopyPath::Gpu));
        assert!(parse_copy_path("dma").is_err());
        assert_eq!(parse_backend("Software"), Ok(Backend::Software));
        assert!(parse_backend("").is_err());
    }

    #[test]
    fn bare_flags_run_by_default() {
        let cli = Cli::try_parse_from(["framelink", "--path", "cpu", "--frames", "2"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.path, Some(CopyPath::Cpu));
        assert_eq!(cli.run.frames, Some(2));
    }

    #[test]
    fn describe_takes_name_and_json() {
        let cli = Cli::try_parse_from(["framelink", "describe", "Test Pattern", "--json"]).unwrap();
        match cli.command {
            Some(Command::Describe { name, json }) => {
                assert_eq!(name, "Test Pattern");
                assert!(json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn flags_override_file_values() {
        let mut config = FramelinkConfig::default();
        let args = RunArgs {
            server: Some("Other".into()),
            backend: Some(Backend::Software),
            size: Some((8, 4)),
            ..RunArgs::default()
        };
        args.apply(&mut config);
        assert_eq!(config.target_server(), "Other");
        assert_eq!(config.receiver.backend, Backend::Software);
        assert_eq!(config.receiver.path, CopyPath::Gpu);
        assert_eq!((config.producer.width, config.producer.height), (8, 4));
    }
}
