use cascata_core::domain::period::Quarter;
use cascata_core::forecast::ForecastQuery;

use crate::commands::{with_service, CommandResult, Completed, GlobalArgs};

pub fn calculate(global: &GlobalArgs, company: Option<String>) -> CommandResult {
    with_service("forecast.calculate", global, company, |service, company| async move {
        let rows = service.calculate_forecast(&company).await?;
        Ok(Completed::new(
            format!("stored {} forecast rows for company `{company}`", rows.len()),
            rows,
        ))
    })
}

pub fn show(global: &GlobalArgs, company: Option<String>) -> CommandResult {
    with_service("forecast.show", global, company, |service, company| async move {
        let rows = service.list_forecast(&company).await?;
        let message = if rows.is_empty() {
            format!("no stored forecast for company `{company}`; run `cascata forecast calculate`")
        } else {
            format!("{} stored forecast rows for company `{company}`", rows.len())
        };
        Ok(Completed::new(message, rows))
    })
}

pub fn summary(
    global: &GlobalArgs,
    company: Option<String>,
    regions: Vec<String>,
    sql_types: Vec<String>,
    from: Option<Quarter>,
    to: Option<Quarter>,
) -> CommandResult {
    let query = ForecastQuery {
        regions: regions.into_iter().collect(),
        sql_types: sql_types.into_iter().collect(),
        from,
        to,
    };

    with_service("forecast.summary", global, company, |service, company| async move {
        let summary = service.summarize_forecast(&company, &query).await?;
        Ok(Completed::new(
            format!(
                "{} forecast rows matched across {} quarters",
                summary.rows_matched,
                summary.quarters.len()
            ),
            summary,
        ))
    })
}
