pub mod file;
pub mod stdin;

use clap::Args;
use rust_decimal::Decimal;
use solar_finance_core::ProjectInputs;

/// Project figures accepted as flags. Any flag given overrides the same field read
/// from `--input` or stdin.
#[derive(Args, Debug, Default, Clone)]
pub struct ProjectFlags {
    /// Path to a JSON or YAML project file
    #[arg(long)]
    pub input: Option<String>,

    /// Installed capacity in kWp (sized from consumption when omitted)
    #[arg(long)]
    pub capacity_kwp: Option<Decimal>,

    /// Average monthly consumption from the bill, kWh
    #[arg(long)]
    pub monthly_consumption: Option<Decimal>,

    /// Peak demand from the bill, kW
    #[arg(long)]
    pub peak_demand: Option<Decimal>,

    /// Average monthly bill amount
    #[arg(long)]
    pub monthly_bill: Option<Decimal>,

    /// Year-1 cost of electricity without the system (overrides bill and tariff)
    #[arg(long)]
    pub baseline_annual_cost: Option<Decimal>,

    /// Grid price per kWh
    #[arg(long)]
    pub grid_tariff: Option<Decimal>,

    /// Financing mode: CAPEX or PPA
    #[arg(long)]
    pub mode: Option<String>,

    /// Upfront capital cost (CAPEX mode)
    #[arg(long)]
    pub capex: Option<Decimal>,

    /// Year-1 PPA price per kWh (PPA mode)
    #[arg(long)]
    pub ppa_price: Option<Decimal>,

    /// Annual PPA price escalation (decimal, e.g. 0.02)
    #[arg(long)]
    pub ppa_escalation: Option<Decimal>,

    /// Performance ratio (decimal, e.g. 0.82)
    #[arg(long)]
    pub performance_ratio: Option<Decimal>,

    /// Annual module degradation (decimal, e.g. 0.007)
    #[arg(long)]
    pub degradation_rate: Option<Decimal>,

    /// Specific yield at the site, kWh per kWp per year
    #[arg(long)]
    pub reference_yield: Option<Decimal>,

    /// Year-1 operation and maintenance cost
    #[arg(long)]
    pub annual_opex: Option<Decimal>,

    /// Annual O&M cost inflation (decimal)
    #[arg(long, allow_hyphen_values = true)]
    pub om_inflation: Option<Decimal>,

    /// Project lifetime in years
    #[arg(long, allow_hyphen_values = true)]
    pub lifetime: Option<i64>,

    /// Discount rate (decimal, e.g. 0.10)
    #[arg(long, allow_hyphen_values = true)]
    pub discount_rate: Option<Decimal>,

    /// Annual tariff escalation (decimal)
    #[arg(long, allow_hyphen_values = true)]
    pub tariff_escalation: Option<Decimal>,

    /// Currency code used to label results
    #[arg(long)]
    pub currency: Option<String>,
}

impl ProjectFlags {
    fn apply(&self, inputs: &mut ProjectInputs) {
        fn set<T: Clone>(target: &mut Option<T>, flag: &Option<T>) {
            if flag.is_some() {
                *target = flag.clone();
            }
        }
        set(&mut inputs.capacity_kwp, &self.capacity_kwp);
        set(&mut inputs.monthly_consumption_kwh, &self.monthly_consumption);
        set(&mut inputs.peak_demand_kw, &self.peak_demand);
        set(&mut inputs.monthly_bill, &self.monthly_bill);
        set(&mut inputs.baseline_annual_cost, &self.baseline_annual_cost);
        set(&mut inputs.grid_tariff, &self.grid_tariff);
        set(&mut inputs.mode, &self.mode);
        set(&mut inputs.capex, &self.capex);
        set(&mut inputs.ppa_initial_price, &self.ppa_price);
        set(&mut inputs.ppa_escalation_rate, &self.ppa_escalation);
        set(&mut inputs.performance_ratio, &self.performance_ratio);
        set(&mut inputs.degradation_rate, &self.degradation_rate);
        set(&mut inputs.reference_yield_kwh_per_kwp, &self.reference_yield);
        set(&mut inputs.annual_opex, &self.annual_opex);
        set(&mut inputs.om_inflation_rate, &self.om_inflation);
        set(&mut inputs.lifetime_years, &self.lifetime);
        set(&mut inputs.discount_rate, &self.discount_rate);
        set(&mut inputs.tariff_escalation_rate, &self.tariff_escalation);
        set(&mut inputs.currency, &self.currency);
    }
}

/// Project inputs from `--input`, else piped stdin, else nothing; flags are layered on
/// top.
pub fn read_project_inputs(flags: &ProjectFlags) -> Result<ProjectInputs, Box<dyn std::error::Error>> {
    let mut inputs: ProjectInputs = if let Some(ref path) = flags.input {
        file::read_structured(path)?
    } else if let Some(data) = stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        ProjectInputs::default()
    };

    flags.apply(&mut inputs);

    if inputs.capacity_kwp.is_none() && inputs.monthly_consumption_kwh.is_none() {
        return Err(
            "--capacity-kwp or --monthly-consumption is required (or provide --input)".into(),
        );
    }
    Ok(inputs)
}
