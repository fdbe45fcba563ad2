//! Extract command implementation.

use crate::cli::Cli;
use crate::error::add_image_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use ext4cp_core::DestDir;
use ext4cp_core::ExtractConfig;
use ext4cp_core::extract_image;
use ext4cp_core::parse_sources;

pub fn execute(cli: &Cli, formatter: &mut dyn OutputFormatter) -> Result<()> {
    // Usage errors surface before the image or destination is touched.
    let (image, targets) = parse_sources(cli.sources.as_slice())?;
    let dest = DestDir::new(&cli.directory)?;

    let config = ExtractConfig {
        recursive: cli.recursive,
        flatten: cli.flatten,
        conflict_rename: cli.conflict_rename,
        filename_workaround: cli.wa_fnames,
        verbosity: cli.verbose,
        ..ExtractConfig::new(image.display().to_string())
    };

    let report = add_image_context(
        extract_image(&image, targets.as_slice(), &dest, &config, formatter),
        &image,
    )?;

    formatter.format_extraction_result(&report)?;

    Ok(())
}
