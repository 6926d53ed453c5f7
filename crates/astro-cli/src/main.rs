mod render;
mod shell;

use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use astro_contracts::events::EventWriter;
use astro_contracts::shell::{
    parse_command, parse_noise_level, parse_toggle, CommandAction, ShellCommand,
    SHELL_HELP_COMMANDS,
};
use astro_engine::{DryrunTransport, HttpTransport, ServiceConfig, ServiceTransport};
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use render::{render_catalog, render_session, render_settings, Theme, WAITING_MESSAGE};
use shell::{SessionContext, PREVIEW_FILE_NAME};

#[derive(Debug, Parser)]
#[command(
    name = "astro-enhance",
    version,
    about = "Front-end for the astronomy image enhancement service"
)]
struct Cli {
    #[command(flatten)]
    service: ServiceArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ServiceArgs {
    /// Service base URL; overrides ASTRO_ENHANCER_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Serve catalog and enhancement from a local stand-in instead of HTTP.
    #[arg(long, global = true)]
    dryrun: bool,
    #[arg(long, value_enum, global = true, default_value_t = Theme::Plain)]
    theme: Theme,
    /// Event log path; defaults to `events.jsonl` in the output directory.
    #[arg(long, global = true)]
    events: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    Catalog(CatalogArgs),
    Enhance(EnhanceArgs),
    Session(SessionArgs),
}

#[derive(Debug, Parser)]
struct CatalogArgs {
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Parser)]
struct EnhanceArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    preset: Option<String>,
    #[arg(long)]
    prompt: Option<String>,
    #[arg(long, default_value_t = 20.0)]
    noise_level: f64,
    #[arg(long)]
    scientific: bool,
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Parser)]
struct SessionArgs {
    #[arg(long)]
    out: PathBuf,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("astro-enhance error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let transport = build_transport(&cli.service)?;
    let service = &cli.service;
    match cli.command {
        Command::Catalog(args) => run_catalog(transport.as_ref(), service, args),
        Command::Enhance(args) => run_enhance(transport.as_ref(), service, args),
        Command::Session(args) => {
            run_session(transport.as_ref(), service, args)?;
            Ok(0)
        }
    }
}

fn build_transport(args: &ServiceArgs) -> Result<Box<dyn ServiceTransport>> {
    if args.dryrun {
        return Ok(Box::new(DryrunTransport::new()));
    }
    let config = ServiceConfig::from_env(args.api_url.as_deref());
    Ok(Box::new(HttpTransport::new(config)?))
}

fn open_events(out: &Path, events: Option<&Path>, session_id: &str) -> EventWriter {
    let path = events
        .map(Path::to_path_buf)
        .unwrap_or_else(|| out.join("events.jsonl"));
    EventWriter::new(path, session_id)
}

/// The catalog command has no output directory, so it logs only on request.
fn run_catalog(
    transport: &dyn ServiceTransport,
    service: &ServiceArgs,
    args: CatalogArgs,
) -> Result<i32> {
    let session_id = Uuid::new_v4().to_string();
    let events = service
        .events
        .as_deref()
        .map(|path| EventWriter::new(path, session_id.as_str()));
    let ctx = SessionContext::start(transport, service.theme, events, session_id);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&ctx.catalog)?);
    } else {
        print!("{}", render_catalog(&ctx.catalog, service.theme));
    }
    Ok(0)
}

fn run_enhance(
    transport: &dyn ServiceTransport,
    service: &ServiceArgs,
    args: EnhanceArgs,
) -> Result<i32> {
    let session_id = Uuid::new_v4().to_string();
    let events = open_events(&args.out, service.events.as_deref(), &session_id);
    let mut ctx = SessionContext::start(transport, service.theme, Some(events), session_id);

    ctx.select_image(&args.image)?;
    if let Some(model) = args.model.as_deref() {
        ctx.select_model(model)?;
    }
    if let Some(preset) = args.preset.as_deref() {
        ctx.select_preset(preset)?;
    }
    ctx.set_custom_prompt(args.prompt.clone());
    ctx.set_noise_level(args.noise_level)?;
    ctx.set_scientific_mode(args.scientific);

    println!("{WAITING_MESSAGE}");
    let enhanced = ctx.submit(transport);
    if enhanced {
        if let Some(path) = ctx.download(&args.out)? {
            println!("Saved {}", path.display());
        }
        ctx.write_comparison(&args.out)?;
        ctx.write_preview(&args.out.join(PREVIEW_FILE_NAME))?;
    }
    print!("{}", render_session(&ctx));
    ctx.finish(&args.out)?;
    Ok(if enhanced { 0 } else { 1 })
}

fn run_session(
    transport: &dyn ServiceTransport,
    service: &ServiceArgs,
    args: SessionArgs,
) -> Result<()> {
    let session_id = Uuid::new_v4().to_string();
    let events = open_events(&args.out, service.events.as_deref(), &session_id);
    let mut ctx = SessionContext::start(transport, service.theme, Some(events), session_id);

    println!("Astronomy enhancer session started. Type /help for commands.");
    print!("{}", render_session(&ctx));

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let (action, arg) = match parse_command(line.trim_end_matches(['\n', '\r'])) {
            ShellCommand::Noop => continue,
            ShellCommand::Text(_) => {
                println!("Commands start with '/'. Type /help for commands.");
                continue;
            }
            ShellCommand::Unknown { command, .. } => {
                println!("Unknown command: /{command}");
                continue;
            }
            ShellCommand::Run { action, arg } => (action, arg),
        };
        if action == CommandAction::Quit {
            break;
        }
        if let Err(err) = apply_command(&mut ctx, transport, &args.out, action, &arg) {
            println!("{err:#}");
        }
    }

    let summary = ctx.finish(&args.out)?;
    println!("Session summary written to {}", summary.display());
    Ok(())
}

fn apply_command(
    ctx: &mut SessionContext,
    transport: &dyn ServiceTransport,
    out_dir: &Path,
    action: CommandAction,
    arg: &str,
) -> Result<()> {
    match action {
        CommandAction::SelectImage => {
            if arg.is_empty() {
                bail!("/image requires a path");
            }
            let upload = ctx.select_image(Path::new(arg))?;
            println!(
                "Image set to {} ({})",
                upload.file_name,
                upload.image.dimensions_label()
            );
        }
        CommandAction::SelectModel => {
            let model = ctx.select_model(arg)?;
            println!("Model set to {model}");
        }
        CommandAction::SelectPreset => {
            let preset = ctx.select_preset(arg)?;
            println!("Preset set to {preset}");
        }
        CommandAction::SetPrompt => {
            ctx.set_custom_prompt(Some(arg.to_string()));
            match ctx.settings.custom_prompt.as_deref() {
                Some(prompt) => println!("Custom prompt set to {prompt}"),
                None => println!("Custom prompt cleared"),
            }
        }
        CommandAction::SetNoiseLevel => {
            let value = parse_noise_level(arg).map_err(anyhow::Error::msg)?;
            ctx.set_noise_level(value)?;
            println!("Noise level set to {value:.1}");
        }
        CommandAction::SetScientificMode => {
            let enabled = parse_toggle(arg)
                .map_err(anyhow::Error::msg)?
                .unwrap_or(!ctx.settings.scientific_mode);
            ctx.set_scientific_mode(enabled);
            println!(
                "Scientific mode {}",
                if enabled { "enabled" } else { "disabled" }
            );
        }
        CommandAction::ListModels | CommandAction::ListPresets => {
            print!("{}", render_catalog(&ctx.catalog, ctx.theme));
        }
        CommandAction::ShowSettings => print!("{}", render_settings(ctx)),
        CommandAction::Enhance => {
            println!("{WAITING_MESSAGE}");
            ctx.submit(transport);
            print!("{}", render_session(ctx));
        }
        CommandAction::Show => print!("{}", render_session(ctx)),
        CommandAction::Download => match ctx.download(&target_dir(out_dir, arg))? {
            Some(path) => println!("Saved {}", path.display()),
            None => println!("Nothing to download yet. Run /enhance first."),
        },
        CommandAction::Compare => match ctx.write_comparison(&target_dir(out_dir, arg))? {
            Some((before, after)) => {
                println!("Saved {} and {}", before.display(), after.display())
            }
            None => println!("Nothing to compare yet. Run /enhance first."),
        },
        CommandAction::Preview => {
            let path = if arg.is_empty() {
                out_dir.join(PREVIEW_FILE_NAME)
            } else {
                PathBuf::from(arg)
            };
            let written = ctx.write_preview(&path)?;
            println!("Preview written to {}", written.display());
        }
        CommandAction::Help => println!("Commands: {}", SHELL_HELP_COMMANDS.join(" ")),
        CommandAction::Quit => {}
    }
    Ok(())
}

fn target_dir(out_dir: &Path, arg: &str) -> PathBuf {
    if arg.is_empty() {
        out_dir.to_path_buf()
    } else {
        PathBuf::from(arg)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    use super::*;

    fn write_jpeg(dir: &Path) -> PathBuf {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([90, 60, 200])))
            .write_to(&mut out, ImageFormat::Jpeg)
            .unwrap();
        let path = dir.join("nebula.jpg");
        fs::write(&path, out.into_inner()).unwrap();
        path
    }

    fn service(events: Option<PathBuf>) -> ServiceArgs {
        ServiceArgs {
            api_url: None,
            dryrun: true,
            theme: Theme::Plain,
            events,
        }
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "astro-enhance",
            "enhance",
            "--image",
            "m31.png",
            "--out",
            "out",
            "--preset",
            "Galaxy",
            "--dryrun",
            "--theme",
            "space",
        ])
        .unwrap();
        assert!(cli.service.dryrun);
        assert_eq!(cli.service.theme, Theme::Space);
        match cli.command {
            Command::Enhance(args) => {
                assert_eq!(args.preset.as_deref(), Some("Galaxy"));
                assert_eq!(args.noise_level, 20.0);
                assert!(!args.scientific);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn one_shot_dryrun_writes_all_outputs() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let out = temp.path().join("out");
        let args = EnhanceArgs {
            image: write_jpeg(temp.path()),
            model: Some("SwinIR (4x)".to_string()),
            preset: Some("Nebula".to_string()),
            prompt: Some(String::new()),
            noise_level: 5.0,
            scientific: true,
            out: out.clone(),
        };

        let code = run_enhance(&DryrunTransport::new(), &service(None), args)?;

        assert_eq!(code, 0);
        let names: Vec<String> = fs::read_dir(&out)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|name| name.starts_with("enhanced_image_")));
        for expected in ["before.png", "after.png", "preview.html", "summary.json", "events.jsonl"] {
            assert!(names.iter().any(|name| name == expected), "missing {expected}");
        }
        Ok(())
    }

    #[test]
    fn one_shot_rejects_out_of_range_noise() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let args = EnhanceArgs {
            image: write_jpeg(temp.path()),
            model: None,
            preset: None,
            prompt: None,
            noise_level: 75.0,
            scientific: false,
            out: temp.path().join("out"),
        };
        assert!(run_enhance(&DryrunTransport::new(), &service(None), args).is_err());
        Ok(())
    }

    #[test]
    fn events_flag_is_accepted_on_every_subcommand() {
        for argv in [
            vec!["astro-enhance", "catalog", "--events", "log.jsonl"],
            vec!["astro-enhance", "--events", "log.jsonl", "session", "--out", "o"],
            vec!["astro-enhance", "enhance", "--image", "a.png", "--out", "o", "--events", "log.jsonl"],
        ] {
            let cli = Cli::try_parse_from(argv.clone()).unwrap();
            assert_eq!(cli.service.events, Some(PathBuf::from("log.jsonl")), "{argv:?}");
        }
    }

    #[test]
    fn catalog_logs_only_when_events_path_is_given() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let log = temp.path().join("catalog.jsonl");
        let transport = DryrunTransport::new();

        run_catalog(&transport, &service(None), CatalogArgs { json: true })?;
        assert!(!log.exists());

        run_catalog(&transport, &service(Some(log.clone())), CatalogArgs { json: true })?;
        let raw = fs::read_to_string(&log)?;
        let first: serde_json::Value = serde_json::from_str(raw.lines().next().unwrap_or(""))?;
        assert_eq!(first["type"], "catalog_loaded");
        assert_eq!(first["transport"], "dryrun");
        Ok(())
    }

    #[test]
    fn events_flag_redirects_the_enhance_log() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let out = temp.path().join("out");
        let log = temp.path().join("logs").join("run.jsonl");
        let args = EnhanceArgs {
            image: write_jpeg(temp.path()),
            model: None,
            preset: None,
            prompt: None,
            noise_level: 20.0,
            scientific: false,
            out: out.clone(),
        };

        run_enhance(&DryrunTransport::new(), &service(Some(log.clone())), args)?;

        assert!(log.exists());
        assert!(!out.join("events.jsonl").exists());
        Ok(())
    }

    #[test]
    fn shell_commands_drive_the_session() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let transport = DryrunTransport::new();
        let mut ctx = SessionContext::start(&transport, Theme::Plain, None, "t".to_string());
        let image = write_jpeg(temp.path());
        let out = temp.path().join("out");

        let script = [
            format!("/image \"{}\"", image.display()),
            "/model 2".to_string(),
            "/preset Deep Field".to_string(),
            "/noise 12.5".to_string(),
            "/scientific".to_string(),
            "/prompt   ".to_string(),
            "/enhance".to_string(),
            "/download".to_string(),
        ];
        for line in &script {
            let ShellCommand::Run { action, arg } = parse_command(line) else {
                panic!("not a command: {line}");
            };
            apply_command(&mut ctx, &transport, &out, action, &arg)?;
        }

        assert_eq!(ctx.settings.model_name, "ESRGAN Plus (4x)");
        assert_eq!(ctx.settings.preset, "Deep Field");
        assert_eq!(ctx.settings.noise_level, 12.5);
        assert!(ctx.settings.scientific_mode);
        assert_eq!(ctx.settings.custom_prompt, None);
        let prompt = &ctx.current().expect("enhanced").result.prompt_used;
        assert!(prompt.contains("preserve scientific accuracy"));
        assert!(prompt.ends_with("(noise level 12.5)"));
        assert_eq!(fs::read_dir(&out)?.count(), 1);
        Ok(())
    }

    #[test]
    fn shell_rejects_bad_arguments_without_changing_settings() {
        let transport = DryrunTransport::new();
        let mut ctx = SessionContext::start(&transport, Theme::Plain, None, "t".to_string());
        let out = PathBuf::from("unused");

        assert!(apply_command(&mut ctx, &transport, &out, CommandAction::SetNoiseLevel, "60").is_err());
        assert!(apply_command(&mut ctx, &transport, &out, CommandAction::SelectImage, "").is_err());
        assert!(
            apply_command(&mut ctx, &transport, &out, CommandAction::SetScientificMode, "maybe")
                .is_err()
        );
        assert_eq!(ctx.settings.noise_level, 20.0);
        assert!(!ctx.settings.scientific_mode);
    }
}
