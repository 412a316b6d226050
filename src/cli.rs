use crate::config::{default_level_names, ConfigSource, RunConfig};
use crate::design::CollisionPolicy;
use crate::io::numeric::DecimalConvention;
use crate::io::{write_design, write_matrix};
use crate::reader::{read_data, registry, ReadOptions, ReaderData};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indexmap::IndexMap;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Decimal mark handling for numeric cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DecimalArg {
    /// Guess from the first rows of the quantity columns
    Auto,
    /// `1,234.5`
    Dot,
    /// `1.234,5`
    Comma,
}

impl DecimalArg {
    pub fn convention(self) -> Option<DecimalConvention> {
        match self {
            DecimalArg::Auto => None,
            DecimalArg::Dot => Some(DecimalConvention::Dot),
            DecimalArg::Comma => Some(DecimalConvention::Comma),
        }
    }
}

/// Infer the sample design of a proteomics export and extract its intensity matrices
#[derive(Parser, Debug)]
#[command(name = "proteomics-design")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the vendor export
    #[arg(short, long, global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Run configuration: "default", "file" (the directory's config/config.yml) or a yml path
    #[arg(long, global = true, default_value = "file")]
    pub yml_file: ConfigSource,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub loglevel: String,

    /// Keep values the vendor did not flag as identified
    #[arg(long, global = true)]
    pub use_imputed: bool,

    /// Do not number duplicated row identifiers
    #[arg(long, global = true)]
    pub keep_duplicate_ids: bool,

    /// Keep the first of two identical sample names instead of failing
    #[arg(long, global = true)]
    pub lenient_collisions: bool,

    /// Decimal mark of numeric cells
    #[arg(long, global = true, value_enum, default_value_t = DecimalArg::Auto)]
    pub decimal: DecimalArg,

    /// Forget the stored design and infer it again
    #[arg(long, global = true)]
    pub reset_design: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the inferred sample designs as JSON
    Design,

    /// Write one CSV per reader and intensity kind, plus the design JSON
    Export {
        /// Output directory
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },
}

impl Cli {
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            use_imputed: self.use_imputed,
            resolve_duplicate_ids: !self.keep_duplicate_ids,
            collision_policy: if self.lenient_collisions {
                CollisionPolicy::LegacyCount
            } else {
                CollisionPolicy::Strict
            },
            decimal: self.decimal.convention(),
            ..ReadOptions::default()
        }
    }
}

/// Summary of the inferred designs. Stored level names are used only when
/// they describe a design of the same depth.
fn design_summary(data: &IndexMap<String, ReaderData>, run_config: &RunConfig) -> Result<serde_json::Value> {
    let mut out = serde_json::Map::new();
    for (name, reader_data) in data {
        let stored = run_config.reader_config(name)?;
        let levels = reader_data.design.depth();
        let level_names: Vec<String> = if stored.levels == levels {
            (0..levels).map(|l| stored.level_name(l)).collect()
        } else {
            default_level_names(levels).iter().map(ToString::to_string).collect()
        };
        out.insert(
            name.clone(),
            serde_json::json!({
                "source": reader_data.source.display().to_string(),
                "all_replicates": reader_data.sample_names,
                "levels": levels,
                "level_names": level_names,
                "analysis_design": reader_data.design,
                "matrices": reader_data
                    .matrices
                    .iter()
                    .map(|(kind, m)| (kind.to_string(), serde_json::json!(m.dimensions())))
                    .collect::<serde_json::Map<_, _>>(),
            }),
        );
    }
    Ok(serde_json::Value::Object(out))
}

fn export(data: &IndexMap<String, ReaderData>, output: &Path) -> Result<()> {
    fs::create_dir_all(output).with_context(|| format!("creating {}", output.display()))?;
    for (name, reader_data) in data {
        for (kind, matrix) in &reader_data.matrices {
            let path = output.join(format!("{}_{}.csv", name, kind));
            write_matrix(matrix, &reader_data.id_column, &path)?;
            info!("Wrote {} matrix {:?} to {}", kind, matrix.dimensions(), path.display());
        }
        let design_path = output.join(format!("{}_design.json", name));
        write_design(&reader_data.design, &design_path)?;
        println!("{}: {} samples written to {}", name, reader_data.sample_names.len(), output.display());
    }
    Ok(())
}

/// Main entry point for CLI
pub fn run_cli(cli: Cli) -> Result<()> {
    let mut run_config = RunConfig::load(&cli.dir, &cli.yml_file)
        .with_context(|| format!("loading configuration for {}", cli.dir.display()))?;

    if cli.reset_design {
        for reader in registry() {
            if run_config.get(reader.name()).is_none() {
                continue;
            }
            let mut reader_config = run_config.reader_config(reader.name())?;
            reader_config.clear();
            run_config.set_reader_config(reader.name(), &reader_config)?;
        }
        info!("Stored designs cleared");
    }

    let options = cli.read_options();
    info!("Read options: {:?}", options);
    let data = read_data(&cli.dir, &mut run_config, &options)
        .with_context(|| format!("reading {}", cli.dir.display()))?;

    if data.is_empty() {
        warn!("Nothing to do for {}", cli.dir.display());
        return Ok(());
    }
    let saved = run_config.save()?;
    info!("Configuration saved to {}", saved.display());

    match &cli.command {
        Commands::Design => {
            let summary = design_summary(&data, &run_config)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Export { output } => export(&data, output)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CONFIG_DIR, CONFIG_FILE};
    use tempfile::tempdir;

    const REPORT: &str = "PG.ProteinGroups,PG.Genes,[1] Grp1_Rep1.PG.Quantity,[2] Grp2_Rep1.PG.Quantity\nP1,GeneA,1,2\n";

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from([
            "proteomics-design",
            "--dir",
            "data",
            "--decimal",
            "comma",
            "--lenient-collisions",
            "design",
        ]);
        let options = cli.read_options();
        assert_eq!(options.decimal, Some(DecimalConvention::Comma));
        assert_eq!(options.collision_policy, CollisionPolicy::LegacyCount);
        assert!(options.resolve_duplicate_ids);
        assert!(!options.use_imputed);
        assert_eq!(cli.yml_file, ConfigSource::File);
    }

    fn write_config(dir: &Path, content: &str) {
        fs::create_dir_all(dir.join(CONFIG_DIR)).unwrap();
        fs::write(dir.join(CONFIG_DIR).join(CONFIG_FILE), content).unwrap();
    }

    #[test]
    fn test_reset_design_touches_existing_sections_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("report.csv"), REPORT).unwrap();
        write_config(
            dir.path(),
            "spectroReader:\n  all_replicates: [X_Y_Z]\n  levels: 3\nplot_settings: 1\n",
        );

        let cli = Cli::parse_from([
            "proteomics-design".to_string(),
            "--dir".to_string(),
            dir.path().display().to_string(),
            "--reset-design".to_string(),
            "design".to_string(),
        ]);
        run_cli(cli).unwrap();

        let run_config = RunConfig::load(dir.path(), &ConfigSource::File).unwrap();
        assert!(run_config.get("mqreader").is_none());
        assert!(run_config.get("plot_settings").is_some());
        let spectro = run_config.reader_config("spectroReader").unwrap();
        assert_eq!(spectro.all_replicates, vec!["Grp1_Rep1", "Grp2_Rep1"]);
        assert_eq!(spectro.levels, 2);
    }

    #[test]
    fn test_summary_level_names_follow_inferred_depth() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("report.csv"), REPORT).unwrap();
        write_config(
            dir.path(),
            "spectroReader:\n  analysis_design:\n    X:\n      Y:\n        Z: X_Y_Z\n  levels: 3\n  level_names: [a, b, c]\n",
        );

        let mut run_config = RunConfig::load(dir.path(), &ConfigSource::File).unwrap();
        let data = read_data(dir.path(), &mut run_config, &ReadOptions::default()).unwrap();
        let summary = design_summary(&data, &run_config).unwrap();
        assert_eq!(summary["spectroReader"]["levels"], 2);
        assert_eq!(summary["spectroReader"]["level_names"], serde_json::json!(["0", "1"]));
    }

    #[test]
    fn test_export_writes_files_and_config() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("report.csv"), REPORT).unwrap();
        let out = dir.path().join("out");

        let cli = Cli::parse_from([
            "proteomics-design".to_string(),
            "--dir".to_string(),
            dir.path().display().to_string(),
            "export".to_string(),
            "--output".to_string(),
            out.display().to_string(),
        ]);
        run_cli(cli).unwrap();

        let csv = fs::read_to_string(out.join("spectroReader_raw.csv")).unwrap();
        assert!(csv.starts_with("PG.Genes,Intensity Grp1_Rep1,Intensity Grp2_Rep1"));
        assert!(out.join("spectroReader_design.json").exists());
        assert!(dir.path().join(CONFIG_DIR).join(CONFIG_FILE).exists());
    }
}
