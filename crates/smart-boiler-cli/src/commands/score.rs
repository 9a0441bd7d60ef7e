use clap::Args;
use smart_boiler_core::urgency::score;
use smart_boiler_core::{Config, UrgencyInputs};

#[derive(Args)]
pub struct ScoreArgs {
    /// Showers in the recent evening window
    #[arg(long, default_value_t = 0.0)]
    history: f64,
    /// People still waiting to shower
    #[arg(long, default_value_t = 0.0)]
    people: f64,
    /// Outside temperature (defaults to the comfort temperature)
    #[arg(long, allow_hyphen_values = true)]
    outside_temp: Option<f64>,
    /// Print the per-term breakdown as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: ScoreArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let inputs = UrgencyInputs {
        history: args.history,
        people: args.people,
        outside_temp: args.outside_temp.unwrap_or(config.urgency.comfort_temperature),
    };
    let result = score(&inputs, &config.urgency);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.value);
    }
    Ok(())
}
