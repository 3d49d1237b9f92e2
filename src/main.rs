//! 12VRGB CLI tool
//!
//! Sends LampArray and vendor reports to a 12VRGB lighting controller.

use std::io;
use std::process;
use std::str::FromStr;

use clap::builder::EnumValueParser;
use clap::{
    crate_description, crate_name, crate_version, value_parser, Arg, ArgAction, ArgMatches,
    Command, ValueEnum,
};
use tracing_subscriber::EnvFilter;

use lampctl::animation::{Animation, AnimationOptions, Breathe, Fade, Millis};
use lampctl::color::Rgb;
use lampctl::controller::Controller;
use lampctl::device::{HidLocator, Locator};
use lampctl::encoder::ResetFlags;
use lampctl::variant::{AnimationLayout, Variant};
use lampctl::{Error, Result};

/// Controller connection config.
#[derive(PartialEq, Eq, Debug)]
struct Config {
    variant: Variant,
    vendor_id: u16,
    product_id: u16,
    verbosity: u8,
}

impl Config {
    fn from_cli(matches: &ArgMatches) -> Self {
        let variant = matches.get_one::<Variant>("variant").copied().unwrap_or_default();
        let protocol = variant.protocol();

        // Fall back to the IDs of the selected firmware revision.
        let vendor_id = matches.get_one::<u16>("vendor-id").copied().unwrap_or(protocol.vendor_id);
        let product_id =
            matches.get_one::<u16>("product-id").copied().unwrap_or(protocol.product_id);

        Self { variant, vendor_id, product_id, verbosity: matches.get_count("verbose") }
    }
}

fn main() {
    let matches = cli().get_matches();
    let config = Config::from_cli(&matches);

    init_logging(config.verbosity);

    if let Err(err) = run(&config, &matches) {
        eprintln!("\x1b[31mError:\x1b[0m {err}");
        process::exit(1);
    }
}

/// Setup the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the verbosity flags.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}={level}", crate_name!())));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

/// Execute the selected subcommand.
fn run(config: &Config, matches: &ArgMatches) -> Result<()> {
    // Listing variants does not require a device.
    if matches.subcommand_name() == Some("variants") {
        print_variants();
        return Ok(());
    }

    let locator = HidLocator::new()?;
    let mut controller =
        Controller::new(locator, config.variant, config.vendor_id, config.product_id);

    match matches.subcommand() {
        Some(("lamp-array", matches)) => lamp_array(config, &mut controller, matches),
        Some(("set-animation", matches)) => {
            let (options, animation) = animation_from_cli(matches)?;
            controller.set_animation(options, &animation)
        },
        Some(("reset", matches)) => controller.reset(ResetFlags {
            bootsel: matches.get_flag("bootsel"),
            clear_flash: matches.get_flag("clear-flash"),
        }),
        Some(("bootsel", _)) => controller.bootsel(),
        _ => unreachable!("subcommand is required"),
    }
}

/// Execute a `lamp-array` subcommand.
fn lamp_array<L: Locator>(
    config: &Config,
    controller: &mut Controller<L>,
    matches: &ArgMatches,
) -> Result<()> {
    match matches.subcommand() {
        Some(("set-control", matches)) => {
            let autonomous = matches.get_one::<bool>("autonomous").copied().unwrap_or_default();
            controller.set_autonomous_mode(autonomous)
        },
        Some(("update", matches)) => controller.update_lamps(&lamps_from_cli(matches)?),
        Some(("update-range", matches)) => {
            let last = config.variant.protocol().lamp_count - 1;
            let start = matches.get_one::<u8>("start").copied().unwrap_or(0);
            let end = matches.get_one::<u8>("end").copied().unwrap_or(last);
            let color = matches.get_one::<Rgb>("color").copied();
            controller.update_range(start, end, color)
        },
        Some(("off", _)) => controller.off(),
        _ => unreachable!("subcommand is required"),
    }
}

/// Pair up the `--lamp` and `--color` options.
fn lamps_from_cli(matches: &ArgMatches) -> Result<Vec<(u8, Rgb)>> {
    let lamp_ids: Vec<u8> = matches.get_many("lamp").into_iter().flatten().copied().collect();
    let colors: Vec<Rgb> = matches.get_many("color").into_iter().flatten().copied().collect();

    if lamp_ids.len() != colors.len() {
        return Err(Error::InvalidCommandArgument(format!(
            "got {} lamps but {} colors",
            lamp_ids.len(),
            colors.len()
        )));
    }

    Ok(lamp_ids.into_iter().zip(colors).collect())
}

/// Read the animation of a `set-animation` subcommand.
///
/// Animation colors are converted to linear RGB.
fn animation_from_cli(matches: &ArgMatches) -> Result<(AnimationOptions, Animation)> {
    let Some((name, matches)) = matches.subcommand() else {
        unreachable!("subcommand is required");
    };

    let options = AnimationOptions {
        lamp_id: matches.get_one::<u8>("lamp").copied().unwrap_or_default(),
        persist: matches.get_flag("default"),
    };

    let animation = match name {
        "breathe" => {
            let on_color = required::<Rgb>(matches, "on-color")?;
            let mut breathe = Breathe::new(on_color);
            replace_from_cli(&mut breathe.off_color, matches, "off-color");
            replace_from_cli(&mut breathe.on_fade, matches, "on-fade-time");
            replace_from_cli(&mut breathe.on_time, matches, "on-time");
            replace_from_cli(&mut breathe.off_fade, matches, "off-fade-time");
            replace_from_cli(&mut breathe.off_time, matches, "off-time");
            breathe.on_color = breathe.on_color.to_linear();
            breathe.off_color = breathe.off_color.to_linear();
            Animation::Breathe(breathe)
        },
        "fade" => {
            let colors = matches.get_many::<Rgb>("color").into_iter().flatten();
            let colors = colors.map(|color| color.to_linear()).collect();
            let mut fade = Fade::new(colors);
            replace_from_cli(&mut fade.fade_time, matches, "fade-time");
            replace_from_cli(&mut fade.hold_time, matches, "hold-time");
            Animation::Fade(fade)
        },
        _ => Animation::None,
    };

    Ok((options, animation))
}

/// Print all supported firmware revisions.
fn print_variants() {
    println!(
        "{:<8}{:<12}{:<7}{:<15}{:<15}{}",
        "NAME", "USB ID", "LAMPS", "AUTONOMOUS", "RESET", "ANIMATION"
    );

    for variant in Variant::value_variants() {
        let protocol = variant.protocol();

        let mut name = variant.to_string();
        if *variant == Variant::default() {
            name.push('*');
        }

        let animation = match protocol.animation.map(|animation| animation.layout) {
            Some(AnimationLayout::Compact) => "compact",
            Some(AnimationLayout::Extended { .. }) => "extended",
            None => "-",
        };

        println!(
            "{:<8}{:<12}{:<7}{:<15}{:<15}{}",
            name,
            format!("{:04x}:{:04x}", protocol.vendor_id, protocol.product_id),
            protocol.lamp_count,
            format!("0x{:02x} {}", protocol.autonomous.id, protocol.autonomous.kind),
            format!("0x{:02x} {}", protocol.reset.id, protocol.reset.kind),
            animation,
        );
    }
}

/// Get clap CLI parameters.
fn cli() -> Command {
    let lamp = Arg::new("lamp")
        .help("Lamp ID")
        .long("lamp")
        .short('l')
        .value_parser(parse_id::<u8>);
    let persist = Arg::new("default")
        .help("Save the animation in flash as the lamp's default")
        .long("default")
        .action(ArgAction::SetTrue);

    Command::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("variant")
                .help("Controller firmware revision")
                .long("variant")
                .ignore_case(true)
                .global(true)
                .value_parser(EnumValueParser::<Variant>::new()),
        )
        .arg(
            Arg::new("vendor-id")
                .help("Override the USB vendor ID [default: per variant]")
                .long("vendor-id")
                .global(true)
                .value_parser(parse_id::<u16>),
        )
        .arg(
            Arg::new("product-id")
                .help("Override the USB product ID [default: per variant]")
                .long("product-id")
                .global(true)
                .value_parser(parse_id::<u16>),
        )
        .arg(
            Arg::new("verbose")
                .help("Increase log verbosity")
                .short('v')
                .global(true)
                .action(ArgAction::Count),
        )
        .subcommand(
            Command::new("lamp-array")
                .about("Control lamps through the LampArray interface")
                .subcommand_required(true)
                .subcommand(
                    Command::new("set-control").about("Toggle autonomous mode").arg(
                        Arg::new("autonomous")
                            .help("Let the controller play its own animations")
                            .long("autonomous")
                            .required(true)
                            .value_parser(value_parser!(bool)),
                    ),
                )
                .subcommand(
                    Command::new("update")
                        .about("Set lamp colors")
                        .arg(lamp.clone().required(true).action(ArgAction::Append))
                        .arg(color_arg().required(true).action(ArgAction::Append)),
                )
                .subcommand(
                    Command::new("update-range")
                        .about("Set the color of a range of lamps, turning them off without color")
                        .arg(
                            Arg::new("start")
                                .help("First lamp ID [default: 0]")
                                .long("start")
                                .value_parser(parse_id::<u8>),
                        )
                        .arg(
                            Arg::new("end")
                                .help("Last lamp ID [default: last lamp]")
                                .long("end")
                                .value_parser(parse_id::<u8>),
                        )
                        .arg(color_arg()),
                )
                .subcommand(Command::new("off").about("Turn off all lamps")),
        )
        .subcommand(
            Command::new("set-animation")
                .about("Change the autonomous animation of a lamp")
                .subcommand_required(true)
                .subcommand(
                    Command::new("none")
                        .about("Turn the lamp off")
                        .arg(lamp.clone())
                        .arg(persist.clone()),
                )
                .subcommand(
                    Command::new("breathe")
                        .about("Fade a color on and off")
                        .arg(lamp.clone())
                        .arg(persist.clone())
                        .arg(
                            Arg::new("on-color")
                                .help("Color while on, as CSS color or 0xRRGGBB")
                                .long("on-color")
                                .required(true)
                                .value_parser(Rgb::from_str),
                        )
                        .arg(
                            Arg::new("off-color")
                                .help("Color while off [default: on color]")
                                .long("off-color")
                                .value_parser(Rgb::from_str),
                        )
                        .arg(time_arg("on-fade-time", "Fade in time", Breathe::DEFAULT_FADE_TIME))
                        .arg(time_arg("on-time", "On time", Breathe::DEFAULT_ON_TIME))
                        .arg(time_arg("off-fade-time", "Fade out time", Breathe::DEFAULT_FADE_TIME))
                        .arg(time_arg("off-time", "Off time", Breathe::DEFAULT_OFF_TIME)),
                )
                .subcommand(
                    Command::new("fade")
                        .about("Crossfade between colors")
                        .arg(lamp)
                        .arg(persist)
                        .arg(color_arg().required(true).num_args(1..).action(ArgAction::Append))
                        .arg(time_arg("fade-time", "Transition time", Fade::DEFAULT_FADE_TIME))
                        .arg(time_arg("hold-time", "Time on each color", Fade::DEFAULT_HOLD_TIME)),
                ),
        )
        .subcommand(
            Command::new("reset")
                .about("Reset the controller")
                .arg(
                    Arg::new("bootsel")
                        .help("Reboot into the bootloader")
                        .long("bootsel")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("clear-flash")
                        .help("Erase saved animations")
                        .long("clear-flash")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("bootsel").about("Reboot into the bootloader"))
        .subcommand(Command::new("variants").about("List supported firmware revisions"))
}

/// LED color option.
fn color_arg() -> Arg {
    Arg::new("color")
        .help("LED color, as CSS color or 0xRRGGBB")
        .long("color")
        .short('c')
        .value_parser(Rgb::from_str)
}

/// Duration option in fractional seconds.
fn time_arg(name: &'static str, help: &str, default: Millis) -> Arg {
    Arg::new(name)
        .help(format!("{help} in seconds [default: {:.1}]", default.0 as f64 / 1000.))
        .long(name)
        .value_parser(Millis::from_str)
}

/// Parse a decimal or `0x` prefixed hexadecimal ID.
fn parse_id<T: TryFrom<u32>>(s: &str) -> std::result::Result<T, String> {
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
    .map_err(|err| format!("invalid ID '{s}': {err}"))?;

    T::try_from(value).map_err(|_| format!("ID {value} is out of range"))
}

/// Read a required CLI option.
fn required<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, name: &str) -> Result<T> {
    matches
        .get_one::<T>(name)
        .cloned()
        .ok_or_else(|| Error::InvalidCommandArgument(format!("missing --{name}")))
}

/// Replace a value with the CLI parameter if it is present.
#[inline]
fn replace_from_cli<T>(option: &mut T, matches: &ArgMatches, name: &str)
where
    T: Clone + Send + Sync + 'static,
{
    if let Some(value) = matches.get_one::<T>(name) {
        *option = value.clone();
    }
}
