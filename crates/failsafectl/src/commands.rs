//! Command implementations for failsafectl.

use anyhow::Result;
use owo_colors::OwoColorize;

use failsafe_common::audit::{LogEntry, LogSeverity};
use failsafe_common::component;
use failsafe_common::ipc::{Method, ResponseData};
use failsafe_common::protocol;
use failsafe_common::state::{OverallStatus, RecoveryMode, SystemState};

use crate::rpc_client::RpcClient;

pub async fn status(socket: Option<&str>) -> Result<()> {
    let mut client = RpcClient::connect(socket).await?;
    match client.call(Method::Status).await? {
        ResponseData::State(state) => print_state(&state),
        other => anyhow::bail!("Unexpected response: {:?}", other),
    }
    Ok(())
}

pub async fn log(socket: Option<&str>, limit: Option<usize>) -> Result<()> {
    let mut client = RpcClient::connect(socket).await?;
    match client.call(Method::Log { limit }).await? {
        ResponseData::Log(entries) => {
            if entries.is_empty() {
                println!("{}", "Audit log is empty".dimmed());
            }
            for entry in &entries {
                print_log_entry(entry);
            }
        }
        other => anyhow::bail!("Unexpected response: {:?}", other),
    }
    Ok(())
}

pub async fn execute(
    socket: Option<&str>,
    credential: String,
    protocol_id: String,
    reason: String,
    mode: RecoveryMode,
    window_minutes: u32,
) -> Result<()> {
    let mut client = RpcClient::connect(socket).await?;
    match client
        .call(Method::Execute {
            credential,
            protocol: protocol_id,
            reason,
            mode,
            window_minutes,
        })
        .await?
    {
        ResponseData::Incident(incident) => {
            println!(
                "{} {} at {}",
                "Protocol executed:".red().bold(),
                incident.protocol_id,
                incident.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            );
            if mode != RecoveryMode::Manual {
                println!(
                    "Recovery ({}) scheduled in {} minute(s)",
                    mode, incident.recovery_window_minutes
                );
            }
        }
        other => anyhow::bail!("Unexpected response: {:?}", other),
    }
    Ok(())
}

pub async fn recover(socket: Option<&str>, credential: String) -> Result<()> {
    let mut client = RpcClient::connect(socket).await?;
    match client.call(Method::RecoverFull { credential }).await? {
        ResponseData::State(state) => {
            println!("{}", "Full recovery complete".green().bold());
            print_state(&state);
        }
        other => anyhow::bail!("Unexpected response: {:?}", other),
    }
    Ok(())
}

pub async fn step(socket: Option<&str>, credential: String) -> Result<()> {
    let mut client = RpcClient::connect(socket).await?;
    match client.call(Method::RecoverStep { credential }).await? {
        ResponseData::State(state) => {
            println!("{}", "Progressive step applied".green());
            print_state(&state);
        }
        other => anyhow::bail!("Unexpected response: {:?}", other),
    }
    Ok(())
}

pub async fn reset(socket: Option<&str>, credential: String) -> Result<()> {
    let mut client = RpcClient::connect(socket).await?;
    match client.call(Method::Reset { credential }).await? {
        ResponseData::State(state) => {
            println!("{}", "System reset to defaults".green().bold());
            print_state(&state);
        }
        other => anyhow::bail!("Unexpected response: {:?}", other),
    }
    Ok(())
}

pub async fn clear_log(socket: Option<&str>, credential: String) -> Result<()> {
    let mut client = RpcClient::connect(socket).await?;
    match client.call(Method::ClearLog { credential }).await? {
        ResponseData::Ok => println!("Audit log cleared"),
        other => anyhow::bail!("Unexpected response: {:?}", other),
    }
    Ok(())
}

/// List the protocol catalog. Purely local; no daemon round trip.
pub fn protocols() {
    for p in protocol::CATALOG {
        let disabled = if p.severity == protocol::Severity::Critical {
            "all components".to_string()
        } else if p.disabled_components.is_empty() {
            "none".to_string()
        } else {
            p.disabled_components.join(", ")
        };
        println!(
            "{:<20} {:<10} disables: {}",
            p.id.bold(),
            p.severity.to_string(),
            disabled
        );
    }
}

fn print_state(state: &SystemState) {
    let status = match state.overall_status {
        OverallStatus::Operational => "OPERATIONAL".green().bold().to_string(),
        OverallStatus::Degraded => "DEGRADED".yellow().bold().to_string(),
        OverallStatus::Maintenance => "MAINTENANCE".blue().bold().to_string(),
        OverallStatus::Emergency => "EMERGENCY".red().bold().to_string(),
        OverallStatus::Offline => "OFFLINE".red().bold().to_string(),
    };
    println!("System status: {}", status);

    if let Some(active) = &state.active_protocol {
        println!("Active protocol: {}", active.red());
    }
    if let Some(incident) = &state.incident {
        println!(
            "Last incident: {} at {} ({})",
            incident.protocol_id,
            incident.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            incident.reason.dimmed()
        );
    }
    if let (Some(at), Some(minutes)) = (state.scheduled_recovery_at, state.remaining_minutes) {
        println!(
            "Recovery ({}) in {} minute(s), at {}",
            state.recovery_mode,
            minutes,
            at.format("%H:%M:%S UTC")
        );
    }

    println!();
    for c in component::registry() {
        let marker = if state.is_active(c.id) {
            "●".green().to_string()
        } else {
            "○".red().to_string()
        };
        println!("  {} {}", marker, c.display_name);
    }
}

fn print_log_entry(entry: &LogEntry) {
    let severity = match entry.severity {
        LogSeverity::Info => "info".blue().to_string(),
        LogSeverity::Warning => "warn".yellow().to_string(),
        LogSeverity::Error => "error".red().to_string(),
        LogSeverity::Success => "ok".green().to_string(),
    };
    println!(
        "{} [{:>5}] {}: {}",
        console::style(entry.timestamp.format("%Y-%m-%d %H:%M:%S")).dim(),
        severity,
        entry.action,
        entry.details
    );
}
