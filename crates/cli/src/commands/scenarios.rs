use cascata_core::domain::scenario::ScenarioId;

use crate::commands::{with_service, CommandResult, Completed, GlobalArgs};

pub fn list(global: &GlobalArgs, company: Option<String>) -> CommandResult {
    with_service("scenarios.list", global, company, |service, company| async move {
        let scenarios = service.list_scenarios(&company).await?;
        Ok(Completed::new(
            format!("{} saved scenarios for company `{company}`", scenarios.len()),
            scenarios,
        ))
    })
}

pub fn show(global: &GlobalArgs, id: String) -> CommandResult {
    with_service("scenarios.show", global, None, |service, _company| async move {
        let scenario = service.get_scenario(&ScenarioId(id)).await?;
        Ok(Completed::new(format!("scenario `{}`", scenario.name), scenario))
    })
}

pub fn delete(global: &GlobalArgs, id: String) -> CommandResult {
    with_service("scenarios.delete", global, None, |service, _company| async move {
        let id = ScenarioId(id);
        service.delete_scenario(&id).await?;
        Ok(Completed::new(format!("deleted scenario {id}"), id))
    })
}
