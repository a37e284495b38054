use crate::commands::{with_service, CommandResult, Completed, GlobalArgs};

pub fn run(global: &GlobalArgs, company: Option<String>) -> CommandResult {
    with_service("performance", global, company, |service, company| async move {
        let rows = service.compare_performance(&company).await?;
        let compared = rows.iter().filter(|row| row.has_forecast && row.has_actual).count();
        Ok(Completed::new(
            format!("{compared} of {} cells have both a forecast and an actual", rows.len()),
            rows,
        ))
    })
}
