//! accio's main application entry point and orchestration logic.
//! Handles command-line argument parsing, generator loading, prompting,
//! and coordinates interactions between the blueprint engine and the runner.

use accio::{
    blueprint::Context,
    cli::{get_args, Command, RunOptions},
    error::{default_error_handler, Error, Result},
    fs::{DirTreeReader, DryRunWriter, FsWriter, Writer},
    ignore::IgnoreRules,
    loader::load_template,
    logger::init_logger,
    manifest::load_manifest,
    processor::{Action, AlwaysOverwrite, Processor, PromptOverwrite},
    prompt::{ask_prompts, DialoguerPrompter},
    renderer::HandlebarsRenderer,
};

/// Main application entry point.
fn main() {
    let args = get_args();
    init_logger(args.verbose);

    let result = match args.command {
        Command::Run(run_args) => run(RunOptions::from(run_args)),
    };
    if let Err(err) = result {
        default_error_handler(err);
    }
}

/// Runs a generator.
///
/// # Flow
/// 1. Loads the generator from a local directory or a git repository
/// 2. Loads and validates its manifest
/// 3. Asks the manifest prompts and builds the base context
/// 4. Walks the generator tree and materializes the output
/// 5. Reports every generated file and any collected failure
fn run(options: RunOptions) -> Result<()> {
    let renderer = HandlebarsRenderer::new();
    let prompter = DialoguerPrompter::new();

    let template = load_template(&options.location)?;
    let root = template.root();
    let manifest = load_manifest(root)?;
    if let Some(help) = &manifest.help {
        println!("{help}");
    }

    let answers = ask_prompts(&manifest.prompts, &prompter)?;
    let context = Context::from_answers(&answers)?;

    let mut ignore = IgnoreRules::new();
    ignore.add_paths(root, &manifest.ignore);
    ignore.add_paths(root, &options.ignore);

    let reader = DirTreeReader::new(root);
    let writer: Box<dyn Writer> =
        if options.dry { Box::new(DryRunWriter) } else { Box::new(FsWriter) };

    let processor =
        Processor::new(&reader, &*writer, &renderer, &context, options.working_dir.clone())
            .with_ignore_rules(ignore)
            .ignore_errors(options.ignore_errors);
    let processor = if options.force || options.dry {
        processor.with_overwrite_policy(AlwaysOverwrite)
    } else {
        processor.with_overwrite_policy(PromptOverwrite::new(&prompter))
    };

    let report = processor.run()?;

    for result in &report.results {
        let shown = result.target.as_ref().unwrap_or(&result.source);
        println!("{}: '{}'", result.action, shown.display());
    }
    for failure in &report.failures {
        eprintln!("{failure}");
    }

    println!(
        "Generation completed in {}: {} rendered, {} copied, {} skipped, {} kept.",
        options.working_dir.display(),
        report.count(Action::Rendered),
        report.count(Action::Copied),
        report.count(Action::Skipped),
        report.count(Action::Kept),
    );

    if !report.failures.is_empty() {
        return Err(Error::RunFailedError { failures: report.failures.len() });
    }
    Ok(())
}
