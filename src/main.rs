use clap::{Arg, ArgAction, Command as ClapCommand};
use log::error;
use std::process;

use pixdrill::commands::{config_from_args, CommandFactory, PixdrillCommandFactory};
use pixdrill::utils::logger::Logger;

fn main() {
    let matches = ClapCommand::new("pixdrill")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Drill pixels at survey points from GeoTIFF images and STAC items and compute statistics")
        .arg(
            Arg::new("points")
                .short('p')
                .long("points")
                .help("CSV of survey points: id,x,y,epsg,time,days,buffer,shape,unit")
                .value_name("FILE")
                .required_unless_present("info"),
        )
        .arg(
            Arg::new("image")
                .short('i')
                .long("image")
                .help("Image path or URL to drill; may be repeated")
                .value_name("PATH")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("image-id")
                .long("image-id")
                .help("Id for each --image, in the same order")
                .value_name("ID")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("stac")
                .long("stac")
                .help("STAC API endpoint to search")
                .value_name("URL"),
        )
        .arg(
            Arg::new("collection")
                .long("collection")
                .help("STAC collection to search; may be repeated")
                .value_name("NAME")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("asset")
                .short('a')
                .long("asset")
                .help("STAC item asset to read; may be repeated")
                .value_name("NAME")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("nearest-n")
                .long("nearest-n")
                .help("Keep only the n items nearest in time to each point (0 keeps all)")
                .value_name("N"),
        )
        .arg(
            Arg::new("property")
                .long("property")
                .help("Item property filter, e.g. 'eo:cloud_cover<=20'; may be repeated")
                .value_name("FILTER")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("ignore")
                .long("ignore")
                .help("Pixel value to ignore, or a comma-separated value per asset")
                .value_name("VALUE")
                .allow_negative_numbers(true),
        )
        .arg(
            Arg::new("stat")
                .short('s')
                .long("stat")
                .help("Standard statistic: mean, stddev, count, countnull, min, max; may be repeated")
                .value_name("NAME")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("buffer-policy")
                .long("buffer-policy")
                .help("Handling of buffers in units foreign to both systems (local_projection, spherical_scale)")
                .value_name("POLICY"),
        )
        .arg(
            Arg::new("retries")
                .long("retries")
                .help("Extra attempts for failed raster opens and reads")
                .value_name("N"),
        )
        .arg(
            Arg::new("concurrent")
                .long("concurrent")
                .help("Drill items in parallel")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("progress")
                .long("progress")
                .help("Show a progress bar")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("TOML drill configuration; flags override its values")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Write statistics JSON here instead of stdout")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("info")
                .long("info")
                .help("Describe an image instead of drilling")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Append log records to this file")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .help("Log level: error, warn, info, debug, trace")
                .value_name("LEVEL"),
        )
        .get_matches();

    let config = match config_from_args(&matches) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    let level = match config.logging.level_filter() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };
    if let Err(e) = Logger::init_global_logger(config.logging.file.as_deref(), level) {
        eprintln!("Error setting up global logger: {}", e);
        process::exit(1);
    }

    let factory = PixdrillCommandFactory::new();
    match factory.create_command(&matches, config) {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
