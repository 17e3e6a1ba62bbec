//! Line-oriented driver for a [`WizardSession`].

use anyhow::{Context, Result};
use client_core::{NavigationRequest, StepChange, WizardSession};
use shared::{
    content::{ExerciseContent, FieldSpec, StepBody},
    domain::ItemId,
};
use tokio::io::{stdin, stdout, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

type Input = Lines<BufReader<Stdin>>;

pub async fn run_wizard(mut session: WizardSession) -> Result<()> {
    let mut input = BufReader::new(stdin()).lines();
    let content = session.content().clone();
    println!("== {} ==", content.title);

    loop {
        let step_no = session.current_step();
        let step = content
            .step(step_no)
            .with_context(|| format!("exercise has no step {step_no}"))?;
        println!("\nStep {step_no} of {}: {}", session.total_steps(), step.title);
        if let Some(intro) = &step.intro {
            println!("{intro}");
        }

        match &step.body {
            StepBody::Fields { fields } => fill_fields(&mut session, &mut input, fields).await?,
            StepBody::Subsections { subsections } => {
                for section in subsections {
                    println!("-- {} --", section.title);
                    fill_fields(&mut session, &mut input, &section.fields).await?;
                }
            }
            StepBody::Repeated { item_fields, .. } => {
                fill_items(&mut session, &mut input, step_no, item_fields).await?
            }
        }

        let answer = prompt(&mut input, &action_hint(&session, &content)).await?;
        let answer = answer.trim();
        match answer.split_once(' ').unwrap_or((answer, "")) {
            ("" | "n" | "s", _) if session.is_last_step() => {
                if let Ok(outcome) = session.save().await {
                    print_notice(&mut session);
                    println!("Saved entry #{}.", outcome.entry.id);
                    return Ok(());
                }
            }
            ("" | "n", _) => {
                let _ = session.next();
            }
            ("s", _) => {
                let _ = session.save().await;
            }
            ("b", _) => {
                if matches!(session.navigation_for_back(), NavigationRequest::ExercisesMenu) {
                    println!("Leaving {} without saving.", content.title);
                    return Ok(());
                }
                let _ = session.back();
            }
            ("j", target) => match target.trim().parse::<usize>() {
                Ok(target) => {
                    if let Ok(StepChange::Unchanged) = session.jump_to(target) {
                        println!("There is no step {target}.");
                    }
                }
                Err(_) => println!("Usage: j <step>"),
            },
            ("c", _) => {
                session.clear_form();
                println!("Form cleared.");
            }
            ("q", _) => {
                println!("Nothing saved.");
                return Ok(());
            }
            _ => println!("Unknown action {answer:?}."),
        }
        print_notice(&mut session);
    }
}

fn action_hint(session: &WizardSession, content: &ExerciseContent) -> String {
    let buttons = &content.buttons;
    if session.is_last_step() {
        format!("[s] {}  [b] {}  [c] clear  [q] quit > ", buttons.save, buttons.back)
    } else {
        format!(
            "[n] {}  [b] {}  [j N] jump  [c] clear  [q] quit > ",
            buttons.next, buttons.back
        )
    }
}

fn print_notice(session: &mut WizardSession) {
    if let Some(notice) = session.notice() {
        println!("* {}", notice.message);
    }
    session.dismiss_notice();
}

async fn prompt(input: &mut Input, text: &str) -> Result<String> {
    let mut out = stdout();
    out.write_all(text.as_bytes()).await?;
    out.flush().await?;
    input
        .next_line()
        .await?
        .context("input closed before the entry was saved")
}

/// Blank answers keep the current value.
async fn fill_fields(
    session: &mut WizardSession,
    input: &mut Input,
    fields: &[FieldSpec],
) -> Result<()> {
    for field in fields {
        let current = session.field(&field.id).to_string();
        let hint = if current.is_empty() {
            field.placeholder.clone().unwrap_or_default()
        } else {
            current
        };
        let answer = prompt(input, &format!("{} [{hint}]: ", field.label)).await?;
        if !answer.trim().is_empty() {
            session.set_field(field.id.clone(), answer.trim());
        }
    }
    Ok(())
}

async fn fill_item(
    session: &mut WizardSession,
    input: &mut Input,
    step: usize,
    item: ItemId,
    item_fields: &[FieldSpec],
) -> Result<()> {
    for field in item_fields {
        let current = session
            .items(step)
            .and_then(|items| items.get(item))
            .map(|existing| existing.value(&field.id).to_string())
            .unwrap_or_default();
        let answer = prompt(input, &format!("  {} [{current}]: ", field.label)).await?;
        if answer.trim().is_empty() {
            continue;
        }
        if let Some(items) = session.items_mut(step) {
            items.set_value(item, &field.id, answer.trim());
        }
    }
    Ok(())
}

async fn fill_items(
    session: &mut WizardSession,
    input: &mut Input,
    step: usize,
    item_fields: &[FieldSpec],
) -> Result<()> {
    let ids = item_ids(session, step);
    for (position, id) in ids.into_iter().enumerate() {
        println!("Item {}", position + 1);
        fill_item(session, input, step, id, item_fields).await?;
    }

    loop {
        let answer = prompt(input, "[a] add item  [r N] remove item  [Enter] done > ").await?;
        let answer = answer.trim();
        match answer.split_once(' ').unwrap_or((answer, "")) {
            ("", _) => return Ok(()),
            ("a", _) => {
                let Some(items) = session.items_mut(step) else {
                    return Ok(());
                };
                let id = items.add_item();
                println!("Item {}", items.len());
                fill_item(session, input, step, id, item_fields).await?;
            }
            ("r", position) => {
                let target = position
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|index| item_ids(session, step).get(index).copied());
                let removed = match (target, session.items_mut(step)) {
                    (Some(id), Some(items)) => items.remove_item(id),
                    _ => false,
                };
                if !removed {
                    println!("Can't remove that item.");
                }
            }
            _ => println!("Unknown action {answer:?}."),
        }
    }
}

fn item_ids(session: &WizardSession, step: usize) -> Vec<ItemId> {
    session
        .items(step)
        .map(|items| items.items().iter().map(|item| item.id).collect())
        .unwrap_or_default()
}
