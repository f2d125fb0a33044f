use anyhow::{Context, anyhow, bail};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::cli::Invocation;
use crate::controller::Controller;
use crate::render::Renderer;
use crate::router::Route;
use crate::store::Store;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add",
        "list",
        "edit",
        "toggle",
        "toggle-all",
        "remove",
        "clear-completed",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, renderer, route, inv))]
pub fn dispatch(
    store: &mut Store,
    renderer: &mut Renderer,
    route: &Route,
    inv: Invocation,
) -> anyhow::Result<()> {
    debug!(
        command = %inv.command,
        args = ?inv.command_args,
        route = %route.to_fragment(),
        "dispatching command"
    );

    store.list();
    let mut ctl = Controller::new(store, Some(route));
    let args = inv.command_args.as_slice();

    match inv.command.as_str() {
        "add" => cmd_add(&mut ctl, args),
        "list" => cmd_list(&mut ctl, renderer, args),
        "edit" => cmd_edit(&mut ctl, args),
        "toggle" => cmd_toggle(&mut ctl, args),
        "toggle-all" => cmd_toggle_all(&mut ctl, args),
        "remove" => cmd_remove(&mut ctl, args),
        "clear-completed" => cmd_clear_completed(&mut ctl),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(ctl, args))]
fn cmd_add(ctl: &mut Controller<'_>, args: &[String]) -> anyhow::Result<()> {
    info!("command add");

    let mut input = args.join(" ");
    if input.trim().is_empty() {
        debug!("blank title; nothing added");
        return Ok(());
    }

    ctl.add_todo(&mut input);
    finish(ctl)?;

    println!("Created todo {}.", ctl.store().items().len());
    Ok(())
}

#[instrument(skip(ctl, renderer, args))]
fn cmd_list(
    ctl: &mut Controller<'_>,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command list");

    if let Some(fragment) = args.first() {
        ctl.on_route_change(&Route::from_fragment(fragment));
    }

    let visible = ctl.filtered_tasks();
    renderer.print_todos(ctl.store().items(), &visible, ctl.visibility())?;
    Ok(())
}

#[instrument(skip(ctl, args))]
fn cmd_edit(ctl: &mut Controller<'_>, args: &[String]) -> anyhow::Result<()> {
    info!("command edit");

    let (target, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("usage: edit <n> <title...>"))?;
    let uuid = resolve_position(ctl, target)?;
    let task = ctl
        .store()
        .find(uuid)
        .cloned()
        .ok_or_else(|| anyhow!("todo {target} disappeared"))?;

    ctl.edit_todo(&task);
    if let Some(draft) = ctl.draft_mut() {
        draft.title = rest.join(" ");
    }
    ctl.done_edit();

    if ctl.is_editing() {
        let message = ctl.store().error().to_string();
        ctl.reset_edit();
        bail!("{message}");
    }

    println!("Updated todo {target}.");
    Ok(())
}

#[instrument(skip(ctl, args))]
fn cmd_toggle(ctl: &mut Controller<'_>, args: &[String]) -> anyhow::Result<()> {
    info!("command toggle");

    let target = args
        .first()
        .ok_or_else(|| anyhow!("usage: toggle <n>"))?;
    let uuid = resolve_position(ctl, target)?;
    ctl.toggle_completed(uuid);
    finish(ctl)?;

    let done = ctl.store().find(uuid).is_some_and(|task| task.completed);
    println!(
        "Marked todo {target} as {}.",
        if done { "completed" } else { "active" }
    );
    Ok(())
}

// No argument behaves like the checkbox: complete all unless all are done.
#[instrument(skip(ctl, args))]
fn cmd_toggle_all(ctl: &mut Controller<'_>, args: &[String]) -> anyhow::Result<()> {
    info!("command toggle-all");

    let value = match args.first().map(|s| s.to_ascii_lowercase()) {
        None => !ctl.all_checked(),
        Some(flag) => match flag.as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => bail!("expected on or off, got: {other}"),
        },
    };

    ctl.toggle_all(value);
    finish(ctl)?;

    println!(
        "Marked {} todo(s) as {}.",
        ctl.store().items().len(),
        if value { "completed" } else { "active" }
    );
    Ok(())
}

#[instrument(skip(ctl, args))]
fn cmd_remove(ctl: &mut Controller<'_>, args: &[String]) -> anyhow::Result<()> {
    info!("command remove");

    let target = args
        .first()
        .ok_or_else(|| anyhow!("usage: remove <n>"))?;
    let uuid = resolve_position(ctl, target)?;
    ctl.remove_todo(uuid);
    finish(ctl)?;

    println!("Removed todo {target}.");
    Ok(())
}

#[instrument(skip(ctl))]
fn cmd_clear_completed(ctl: &mut Controller<'_>) -> anyhow::Result<()> {
    info!("command clear-completed");

    let before = ctl.store().items().len();
    ctl.remove_completed();
    finish(ctl)?;

    println!(
        "Cleared {} completed todo(s).",
        before - ctl.store().items().len()
    );
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "Commands: add <title...>, list [route], edit <n> <title...>, toggle <n>, toggle-all [on|off], remove <n>, clear-completed, version"
    );
    Ok(())
}

fn resolve_position(ctl: &Controller<'_>, token: &str) -> anyhow::Result<Uuid> {
    let position: usize = token
        .parse()
        .with_context(|| format!("expected a todo number, got: {token}"))?;
    position
        .checked_sub(1)
        .and_then(|idx| ctl.store().items().get(idx))
        .map(|task| task.uuid)
        .ok_or_else(|| anyhow!("no todo numbered {position}"))
}

fn finish(ctl: &Controller<'_>) -> anyhow::Result<()> {
    let message = ctl.store().error();
    if message.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("{message}"))
    }
}
