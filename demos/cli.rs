//! Command-line interface for salient_palette
//!
//! Loads an image, extracts a saliency-weighted palette and prints it as a
//! table or as JSON. Set `RUST_LOG=salient_palette=debug` for stage timings.

use salient_palette::{extract_palette, image_loader, Palette, PaletteConfig};
use std::{env, path::Path, process};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_COLORS: usize = 5;

fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut colors = DEFAULT_COLORS;
    let mut json_output = false;
    let mut sequential = false;
    let mut config_path = None;
    let mut image_path_arg = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--colors" | "-k" => {
                i += 1;
                colors = match args.get(i).map(|v| v.parse::<usize>()) {
                    Some(Ok(n)) => n,
                    _ => {
                        eprintln!("Error: --colors expects a positive integer");
                        process::exit(1);
                    }
                };
            }
            "--config" => {
                i += 1;
                match args.get(i) {
                    Some(path) => config_path = Some(path.clone()),
                    None => {
                        eprintln!("Error: --config expects a file path");
                        process::exit(1);
                    }
                }
            }
            "--json" => json_output = true,
            "--sequential" => sequential = true,
            "--help" | "-h" => {
                print_help(&args[0]);
                process::exit(0);
            }
            arg if !arg.starts_with('-') => {
                if image_path_arg.is_none() {
                    image_path_arg = Some(arg.to_string());
                } else {
                    eprintln!("Error: Multiple image paths provided");
                    process::exit(1);
                }
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                eprintln!("Use --help for usage information");
                process::exit(1);
            }
        }
        i += 1;
    }

    let image_path_str = match image_path_arg {
        Some(path) => path,
        None => {
            print_help(&args[0]);
            process::exit(1);
        }
    };

    let mut config = match config_path {
        Some(path) => {
            PaletteConfig::from_json_file(Path::new(&path)).unwrap_or_else(|error| fail(error))
        }
        None => PaletteConfig::default(),
    };
    if sequential {
        config.parallel = false;
    }

    let image =
        image_loader::load_image(Path::new(&image_path_str)).unwrap_or_else(|error| fail(error));
    let palette = extract_palette(&image, colors, &config).unwrap_or_else(|error| fail(error));

    if json_output {
        match serde_json::to_string_pretty(&palette) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing palette: {}", e);
                process::exit(1);
            }
        }
    } else {
        print_table(&palette);
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn fail(error: salient_palette::AnalysisError) -> ! {
    eprintln!("Palette extraction failed: {}", error);
    if error.is_recoverable() {
        eprintln!("Suggestion: {}", error.user_message());
    }
    process::exit(1);
}

fn print_help(program_name: &str) {
    eprintln!("Usage: {} [OPTIONS] <image_path>", program_name);
    eprintln!();
    eprintln!("Extract a saliency-weighted color palette from an image.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --colors, -k N   Number of swatches (default: {})", DEFAULT_COLORS);
    eprintln!("  --config FILE    Load parameters from a JSON file");
    eprintln!("  --json           Print the palette and metadata as JSON");
    eprintln!("  --sequential     Disable parallel execution");
    eprintln!("  --help, -h       Show this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} photo.jpg", program_name);
    eprintln!("  {} -k 8 --json poster.png", program_name);
}

fn print_table(palette: &Palette) {
    println!(
        "{:<3} {:<8} {:>13} {:>22} {:>8} {:>8} {:>8}",
        "#", "Hex", "RGB", "CMYK %", "Mass", "Share", "Cover"
    );
    for (rank, swatch) in palette.swatches.iter().enumerate() {
        let [r, g, b] = swatch.rgb;
        let cmyk = &swatch.cmyk;
        println!(
            "{:<3} {:<8} {:>13} {:>22} {:>8.2} {:>7.1}% {:>7.1}%",
            rank + 1,
            swatch.hex,
            format!("{},{},{}", r, g, b),
            format!(
                "{:.0},{:.0},{:.0},{:.0}",
                cmyk.cyan, cmyk.magenta, cmyk.yellow, cmyk.key
            ),
            swatch.saliency_mass,
            swatch.saliency_share * 100.0,
            swatch.coverage * 100.0
        );
    }

    let meta = &palette.metadata;
    eprintln!();
    eprintln!(
        "{}x{} image, {} of {} requested swatches",
        meta.width,
        meta.height,
        palette.len(),
        meta.requested_colors
    );
    eprintln!(
        "Saliency: mean {:.3}, std {:.3}, p10 {:.3}, p90 {:.3}",
        meta.saliency.mean,
        meta.saliency.std,
        meta.saliency.percentile_10,
        meta.saliency.percentile_90
    );
}
