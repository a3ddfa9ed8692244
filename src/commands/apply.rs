//! `apply` - converge one inventory to its declaration

use anyhow::{Context as AnyhowContext, Result};
use declarative::{ApplyContext, Change, Error as CoreError, Outcome, reconcile};
use serde_json::{Value, json};
use towerkit::Client;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::config;
use crate::inventory::InventorySpec;
use crate::ui;

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let desired = InventorySpec::from_args(&args.inventory)?.to_descriptor()?;
    let client = Client::new(config::load(&args.connection)?)
        .context("Could not set up the API client")?;

    log::info!(
        "Reconciling inventory '{}' in organization '{}' on {}",
        desired.name,
        desired.scope.name_or_id,
        client.host()
    );

    match reconcile(&client, &desired, ApplyContext::new(args.check)) {
        Ok(outcome) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result_json(&outcome))?);
            } else if !ctx.quiet {
                print_outcome(ctx, &outcome, client.host());
            }
            Ok(())
        }
        Err(err) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&failure_json(&err))?);
            }
            Err(err).with_context(|| format!("Could not reconcile inventory '{}'", desired.name))
        }
    }
}

/// Machine-readable result, shaped like an Ansible module result
pub fn result_json(outcome: &Outcome) -> Value {
    json!({
        "changed": outcome.changed(),
        "name": outcome.name,
        "id": outcome.id,
        "copied": outcome.copied,
        "check_mode": outcome.check_mode,
        "actions": outcome.changes,
    })
}

/// Machine-readable failure
pub fn failure_json(err: &CoreError) -> Value {
    let mut result = json!({
        "failed": true,
        "changed": false,
        "msg": err.to_string(),
    });
    if let CoreError::RemoteRequest {
        status: Some(status),
        ..
    } = err
    {
        result["status"] = json!(status);
    }
    result
}

fn print_outcome(ctx: &Context, outcome: &Outcome, host: &str) {
    ui::header(&format!("Inventory: {}", outcome.name));
    if ctx.verbose > 0 {
        ui::kv("host", host);
    }
    if outcome.check_mode {
        ui::info("Check mode: nothing was changed");
    }

    let would = |done: &str| {
        if outcome.check_mode {
            format!("would be {done}")
        } else {
            done.to_string()
        }
    };

    for change in &outcome.changes {
        match change {
            Change::Copied { from } => {
                ui::changed("+", &format!("{} from '{from}'", would("copied")));
            }
            Change::Created { fields } => {
                ui::changed("+", &would("created"));
                for (field, value) in fields {
                    ui::kv(field, &ui::render_value(value));
                }
            }
            Change::Updated { fields, previous } => {
                ui::changed("~", &would("updated"));
                for (field, value) in fields {
                    let before = previous.get(field).unwrap_or(&Value::Null);
                    ui::field_change(field, before, value);
                }
            }
            Change::Deleted { id } => {
                ui::changed("-", &format!("{} (id {id})", would("deleted")));
            }
            Change::Associated { association, id } => {
                ui::changed("+", &format!("{association}: {id} {}", would("added")));
            }
            Change::Disassociated { association, id } => {
                ui::changed("-", &format!("{association}: {id} {}", would("removed")));
            }
        }
    }

    if !outcome.changed() {
        ui::success("Already up to date");
    }
    match outcome.id {
        Some(id) => ui::kv("id", &id.to_string()),
        None if outcome.check_mode => ui::dim("id assigned on creation"),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::Operation;

    #[test]
    fn test_result_json_unchanged() {
        let mut outcome = Outcome::new("Foo", false);
        outcome.id = Some(7);
        let result = result_json(&outcome);
        assert_eq!(result["changed"], json!(false));
        assert_eq!(result["id"], json!(7));
        assert_eq!(result["actions"], json!([]));
    }

    #[test]
    fn test_result_json_actions() {
        let mut outcome = Outcome::new("Foo", true);
        outcome.push(Change::Deleted { id: 7 });
        outcome.push(Change::Associated {
            association: "instance_groups".into(),
            id: 3,
        });
        let result = result_json(&outcome);
        assert_eq!(result["changed"], json!(true));
        assert_eq!(result["check_mode"], json!(true));
        assert_eq!(result["actions"][0], json!({"action": "deleted", "id": 7}));
        assert_eq!(
            result["actions"][1],
            json!({"action": "associated", "association": "instance_groups", "id": 3})
        );
    }

    #[test]
    fn test_failure_json_carries_status() {
        let err = CoreError::RemoteRequest {
            operation: Operation::Create,
            collection: "inventories".into(),
            message: "name: This field is required.".into(),
            status: Some(400),
        };
        let result = failure_json(&err);
        assert_eq!(result["failed"], json!(true));
        assert_eq!(result["status"], json!(400));
        assert!(result["msg"].as_str().unwrap().contains("required"));
    }

    #[test]
    fn test_failure_json_local_error() {
        let err = CoreError::InvalidTransition("cannot turn".into());
        let result = failure_json(&err);
        assert!(result.get("status").is_none());
    }
}
