//! `watch`: follow the push stream until interrupted.
//!
//! Runs a full controller (periodic refresh, dedup sweep, auto-reset
//! timers) and prints each notification as it is produced.

use chrono::Local;
use owo_colors::OwoColorize;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use hubwatch_api::ReconnectConfig;
use hubwatch_core::{CloudApi, Controller, Notification};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

pub async fn handle(
    api: CloudApi,
    session: Session,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let cancel = CancellationToken::new();
    let stream = api.open_event_stream(ReconnectConfig::default(), cancel.child_token())?;
    // Subscribed before the first poll so pushes during it are queued.
    let events = stream.as_ref().map(|handle| handle.subscribe());

    let controller = Controller::new(api, session.controller);
    let mut notifications = controller.notifications();
    controller.start().await?;

    match events {
        Some(rx) => controller.attach_stream(rx).await,
        None => warn!(
            profile = %session.profile_name,
            "no sse_url configured; changes only show up on periodic refresh"
        ),
    }

    let only_space = match args.space.as_deref() {
        Some(identifier) => Some(super::util::resolve_space(&controller, identifier)?.id.clone()),
        None => None,
    };
    let color = output::should_color(&global.color);
    info!(spaces = controller.spaces_snapshot().len(), "watching");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            biased;
            _ = &mut ctrl_c => break,
            received = notifications.recv() => match received {
                Ok(notification) => {
                    if only_space.as_deref().is_some_and(|id| id != notification.space_id()) {
                        continue;
                    }
                    if matches!(*notification, Notification::StateUpdated { .. }) && !args.all {
                        continue;
                    }
                    let line = render(&controller, &notification, &global.output, color)?;
                    output::print_output(&line, global.quiet);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "output fell behind, notifications dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    cancel.cancel();
    controller.shutdown().await;
    controller.api().logout();
    Ok(())
}

fn render(
    controller: &Controller<CloudApi>,
    notification: &Notification,
    format: &OutputFormat,
    color: bool,
) -> Result<String, CliError> {
    let at = Local::now();
    Ok(match format {
        OutputFormat::Json | OutputFormat::JsonCompact => {
            let value = serde_json::json!({
                "at": at.to_rfc3339(),
                "notification": notification,
            });
            serde_json::to_string(&value)?
        }
        OutputFormat::Table | OutputFormat::Plain => {
            let space_name = controller
                .store()
                .space(notification.space_id())
                .map(|s| s.name.clone());
            let stamp = at.format("%H:%M:%S").to_string();
            let stamp = if color { stamp.dimmed().to_string() } else { stamp };
            format!("{stamp} {}", describe(notification, space_name.as_deref(), color))
        }
    })
}

/// One human-readable line per notification.
fn describe(notification: &Notification, space_name: Option<&str>, color: bool) -> String {
    match notification {
        Notification::StateUpdated { space_id } => {
            format!("{}: state updated", space_name.unwrap_or(space_id))
        }
        Notification::SecurityChanged {
            space_name,
            action,
            source_name,
            ..
        } => format!(
            "{space_name}: {} by {}",
            output::security_label(*action, color),
            source_name.as_deref().unwrap_or("unknown")
        ),
        Notification::NewSmartLock { space_id, lock_id } => {
            format!("{}: new smart lock {lock_id}", space_name.unwrap_or(space_id))
        }
        Notification::DoorbellRing {
            space_name,
            device_name,
            ..
        } => {
            let text = format!("{space_name}: doorbell '{device_name}' rang");
            if color { text.bold().to_string() } else { text }
        }
        Notification::ScenarioTriggered {
            space_name,
            scenario_name,
            target_name,
            event_tag,
            ..
        } => format!("{space_name}: scenario '{scenario_name}' ({event_tag}) on {target_name}"),
    }
}
