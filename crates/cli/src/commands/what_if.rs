use cascata_core::domain::scenario::WhatIfAdjustment;
use cascata_core::forecast::WhatIfResult;
use cascata_core::money::{BasisPoints, Cents};
use serde::Serialize;

use crate::commands::{with_service, CommandResult, Completed, GlobalArgs};

/// Adjustment flags for `cascata what-if`.
#[derive(Debug, Clone, clap::Args)]
pub struct AdjustmentArgs {
    #[arg(
        long,
        default_value_t = 1.0,
        allow_negative_numbers = true,
        help = "Multiplier applied to opportunity coverage"
    )]
    pub multiplier: f64,
    #[arg(
        long,
        default_value_t = 0,
        allow_negative_numbers = true,
        help = "New-business ACV delta in cents"
    )]
    pub acv_new_delta: i64,
    #[arg(
        long,
        default_value_t = 0,
        allow_negative_numbers = true,
        help = "Upsell ACV delta in cents"
    )]
    pub acv_upsell_delta: i64,
    #[arg(
        long,
        default_value_t = 0,
        allow_negative_numbers = true,
        help = "Same-quarter share delta in basis points"
    )]
    pub same_quarter_delta: i64,
    #[arg(
        long,
        default_value_t = 0,
        allow_negative_numbers = true,
        help = "Next-quarter share delta in basis points"
    )]
    pub next_quarter_delta: i64,
    #[arg(
        long,
        default_value_t = 0,
        allow_negative_numbers = true,
        help = "Two-quarter share delta in basis points"
    )]
    pub two_quarter_delta: i64,
}

impl AdjustmentArgs {
    pub fn adjustment(&self) -> WhatIfAdjustment {
        WhatIfAdjustment {
            conversion_rate_multiplier: self.multiplier,
            acv_new_adjustment: Cents(self.acv_new_delta),
            acv_upsell_adjustment: Cents(self.acv_upsell_delta),
            same_quarter_adjustment: BasisPoints(self.same_quarter_delta),
            next_quarter_adjustment: BasisPoints(self.next_quarter_delta),
            two_quarter_adjustment: BasisPoints(self.two_quarter_delta),
        }
    }
}

#[derive(Debug, Serialize)]
struct WhatIfOutput {
    #[serde(flatten)]
    result: WhatIfResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario_id: Option<String>,
}

pub fn run(
    global: &GlobalArgs,
    company: Option<String>,
    adjustment: &AdjustmentArgs,
    save_as: Option<String>,
    description: Option<String>,
) -> CommandResult {
    let adjustment = adjustment.adjustment();

    with_service("what-if", global, company, |service, company| async move {
        let result = service.evaluate_what_if(&company, &adjustment).await?;
        let impact = &result.impact;
        let mut message = format!(
            "revenue change {} cents ({}%), opportunity change {} ({}%)",
            impact.total_revenue_change.0,
            impact.total_revenue_change_percent,
            impact.total_opportunities_change.0,
            impact.total_opportunities_change_percent
        );

        let scenario_id = match save_as {
            Some(name) => {
                let id = service
                    .save_scenario(&company, &name, description, adjustment, result.impact.clone())
                    .await?;
                message.push_str(&format!("; saved as scenario {id}"));
                Some(id.0)
            }
            None => None,
        };

        Ok(Completed::new(message, WhatIfOutput { result, scenario_id }))
    })
}
