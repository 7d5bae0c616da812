use std::path::PathBuf;
use std::process::exit;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

use lawtree_backend::grammar::GrammarVariant;
use lawtree_backend::logger;
use lawtree_backend::settings::ConverterSettings;
use lawtree_backend::structure_builder::InvalidPathPolicy;

use lawtree_cli::fact_writer::FactWriter;
use lawtree_cli::importer::{CfrImporter, CodesImporter, LawImporter, OutlineImporter, UscImporter};
use lawtree_cli::tables::TableSet;

#[derive(Parser, Debug)]
#[command(author, version, about = "Rebuild legal code hierarchies as structural facts", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// JSON settings file
    #[arg(long, global = true, value_name = "FILE", env = "LAWTREE_SETTINGS")]
    settings: Option<PathBuf>,

    /// Heading grammar: bracket-heavy, dash-heavy or em-dash-heavy
    #[arg(long, global = true)]
    grammar: Option<GrammarVariant>,

    /// Write one <document>.jsonl per document here instead of stdout
    #[arg(long, global = true, value_name = "DIRECTORY_PATH", env = "LAWTREE_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Skip heading records with malformed paths instead of abandoning the document
    #[arg(long, global = true, default_value_t = false)]
    skip_invalid_paths: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a California codes table set (CODES_TBL.dat, LAW_TOC_TBL.dat, ...)
    #[command(arg_required_else_help = true)]
    Codes {
        /// Directory with the unpacked .dat tables
        #[arg(value_name = "DIRECTORY_PATH")]
        dir: PathBuf,

        /// Only convert these codes (repeatable)
        #[arg(long = "code", value_name = "CODE")]
        codes: Vec<String>,

        /// Print the available codes and exit
        #[arg(long, default_value_t = false)]
        list_codes: bool,
    },

    /// Convert styled outline listings (STYLE<TAB>text per line)
    #[command(arg_required_else_help = true)]
    Outline {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Convert US Code title TOC files (nested supsec elements); dash-heavy by default
    #[command(arg_required_else_help = true)]
    Usc {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Convert federal regulations volume XML (CFRDOC); em-dash-heavy by default
    #[command(arg_required_else_help = true)]
    Cfr {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = match &cli.settings {
        Some(path) => ConverterSettings::load(path)?,
        None => ConverterSettings::default(),
    };
    // a grammar chosen on the command line or in a settings file wins over
    // the per-source default
    let chosen_grammar = cli.grammar.or(cli.settings.is_some().then_some(settings.grammar));
    if let Some(grammar) = cli.grammar {
        settings.grammar = grammar;
    }
    if let Some(dir) = cli.output_dir {
        settings.output_dir = Some(dir);
    }
    if cli.skip_invalid_paths {
        settings.invalid_path_policy = InvalidPathPolicy::Skip;
    }

    let mut writer = FactWriter::new(settings.output_dir.as_deref())?;

    let summary = match cli.command {
        Commands::Codes {
            dir,
            codes,
            list_codes,
        } => {
            let tables = TableSet::open(&dir)?;
            if list_codes {
                for entry in tables.read_codes()? {
                    println!("{}: {}", entry.code, entry.title);
                }
                return Ok(());
            }
            CodesImporter::new(
                tables,
                &codes,
                settings.grammar_config(),
                settings.invalid_path_policy,
            )
            .import(&mut writer)?
        }

        Commands::Outline { files } => {
            OutlineImporter::new(
                files,
                settings.grammar_config(),
                settings.levels.is_some(),
                settings.invalid_path_policy,
            )
            .import(&mut writer)?
        }

        Commands::Usc { files } => {
            settings.grammar = chosen_grammar.unwrap_or(GrammarVariant::DashHeavy);
            UscImporter::new(files, settings.grammar_config(), settings.invalid_path_policy)
                .import(&mut writer)?
        }

        Commands::Cfr { files } => {
            settings.grammar = chosen_grammar.unwrap_or(GrammarVariant::EmDashHeavy);
            CfrImporter::new(
                files,
                settings.grammar_config(),
                settings.levels.is_some(),
                settings.invalid_path_policy,
            )
            .import(&mut writer)?
        }
    };

    logger::info(&summary.report());
    if !summary.failed.is_empty() {
        anyhow::bail!("{} document(s) could not be built", summary.failed.len());
    }

    Ok(())
}

fn main() {
    // .env may set LOG_LEVEL, LAWTREE_LOG_FILE or LAWTREE_OUTPUT_DIR
    let _ = dotenv();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        exit(1);
    }
}
