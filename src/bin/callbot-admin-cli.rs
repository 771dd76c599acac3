//! callbot-admin CLI - operator console
//!
//! Provides command-line access to:
//! - Session management (login / logout)
//! - Vulnerable individual directory
//! - Question sets, call history, statistics
//! - Account approvals (root only)
//! - Starting consultations and watching live status
//!
//! Usage:
//!   callbot-admin-cli login <user_id> <password>
//!   callbot-admin-cli vulnerable list [--search <term>] [--page <n>]
//!   callbot-admin-cli call start --question-set <id> <vulnerable_id>...
//!   callbot-admin-cli status [--updates <n>]
//!   callbot-admin-cli stats [--round <n>]

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tracing_subscriber::EnvFilter;

use callbot_admin_lib::api::HistoryQuery;
use callbot_admin_lib::auth::{self, LoginForm, LoginOutcome, RegisterForm};
use callbot_admin_lib::config::AppConfig;
use callbot_admin_lib::models::Gender;
use callbot_admin_lib::routes::{self, RouteDecision};
use callbot_admin_lib::views::approvals::ApprovalQueue;
use callbot_admin_lib::views::consultations::ConsultationPlanner;
use callbot_admin_lib::views::history::CallHistoryView;
use callbot_admin_lib::views::questions::QuestionBank;
use callbot_admin_lib::views::statistics::StatisticsView;
use callbot_admin_lib::views::status::StatusView;
use callbot_admin_lib::views::vulnerable::VulnerableDirectory;
use callbot_admin_lib::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI command structure
#[derive(Debug)]
enum Command {
    Login { user_id: String, password: String },
    Logout,
    Whoami,
    Register {
        user_id: String,
        password: String,
        email: String,
        phone: String,
    },
    Vulnerable(VulnerableCommand),
    Questions(QuestionsCommand),
    History(HistoryCommand),
    Approvals(ApprovalsCommand),
    CallStart {
        question_set: String,
        vulnerable_ids: Vec<String>,
    },
    StatusWatch { updates: usize },
    Stats { round: Option<u32> },
    Dashboard,
    Help,
    Version,
}

#[derive(Debug)]
enum VulnerableCommand {
    List { search: Option<String>, page: usize },
    Show { id: String },
    Delete { ids: Vec<String> },
    Export,
}

#[derive(Debug)]
enum QuestionsCommand {
    List { search: Option<String> },
    Show { id: String },
}

#[derive(Debug)]
enum HistoryCommand {
    List {
        page: u32,
        size: u32,
        search: Option<String>,
    },
    Show { id: String },
}

#[derive(Debug)]
enum ApprovalsCommand {
    List,
    Decide { user_id: String, approve: bool },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    match parse_args(&args) {
        Ok(cmd) => match run_command(cmd) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            ExitCode::FAILURE
        }
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn positional(args: &[String], skip: usize) -> Vec<String> {
    // Everything after `skip` that is not a flag or a flag value
    let mut out = Vec::new();
    let mut i = skip;
    while i < args.len() {
        if args[i].starts_with("--") {
            i += 2;
        } else {
            out.push(args[i].clone());
            i += 1;
        }
    }
    out
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    if args.len() < 2 {
        return Ok(Command::Help);
    }

    match args[1].as_str() {
        "help" | "--help" | "-h" => Ok(Command::Help),
        "version" | "--version" | "-V" => Ok(Command::Version),
        "login" => {
            let rest = positional(args, 2);
            match rest.as_slice() {
                [user_id, password] => Ok(Command::Login {
                    user_id: user_id.clone(),
                    password: password.clone(),
                }),
                _ => Err("usage: login <user_id> <password>".to_string()),
            }
        }
        "logout" => Ok(Command::Logout),
        "whoami" => Ok(Command::Whoami),
        "register" => {
            let rest = positional(args, 2);
            match rest.as_slice() {
                [user_id, password, email, phone] => Ok(Command::Register {
                    user_id: user_id.clone(),
                    password: password.clone(),
                    email: email.clone(),
                    phone: phone.clone(),
                }),
                _ => Err("usage: register <user_id> <password> <email> <phone>".to_string()),
            }
        }
        "vulnerable" => {
            let sub = args.get(2).map(String::as_str).unwrap_or("list");
            match sub {
                "list" => Ok(Command::Vulnerable(VulnerableCommand::List {
                    search: flag_value(args, "--search"),
                    page: flag_value(args, "--page")
                        .and_then(|p| p.parse().ok())
                        .unwrap_or(1),
                })),
                "show" => {
                    let id = args.get(3).cloned().ok_or("usage: vulnerable show <id>")?;
                    Ok(Command::Vulnerable(VulnerableCommand::Show { id }))
                }
                "delete" => {
                    let ids = positional(args, 3);
                    if ids.is_empty() {
                        return Err("usage: vulnerable delete <id>...".to_string());
                    }
                    Ok(Command::Vulnerable(VulnerableCommand::Delete { ids }))
                }
                "export" => Ok(Command::Vulnerable(VulnerableCommand::Export)),
                other => Err(format!("unknown vulnerable subcommand: {}", other)),
            }
        }
        "questions" => {
            let sub = args.get(2).map(String::as_str).unwrap_or("list");
            match sub {
                "list" => Ok(Command::Questions(QuestionsCommand::List {
                    search: flag_value(args, "--search"),
                })),
                "show" => {
                    let id = args.get(3).cloned().ok_or("usage: questions show <id>")?;
                    Ok(Command::Questions(QuestionsCommand::Show { id }))
                }
                other => Err(format!("unknown questions subcommand: {}", other)),
            }
        }
        "history" => {
            let sub = args.get(2).map(String::as_str).unwrap_or("list");
            match sub {
                "list" => Ok(Command::History(HistoryCommand::List {
                    page: flag_value(args, "--page")
                        .and_then(|p| p.parse().ok())
                        .unwrap_or(0),
                    size: flag_value(args, "--size")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(20),
                    search: flag_value(args, "--search"),
                })),
                "show" => {
                    let id = args.get(3).cloned().ok_or("usage: history show <id>")?;
                    Ok(Command::History(HistoryCommand::Show { id }))
                }
                other => Err(format!("unknown history subcommand: {}", other)),
            }
        }
        "approvals" => {
            let sub = args.get(2).map(String::as_str).unwrap_or("list");
            match sub {
                "list" => Ok(Command::Approvals(ApprovalsCommand::List)),
                "decide" => {
                    let rest = positional(args, 3);
                    match rest.as_slice() {
                        [user_id, decision] => {
                            let approve = match decision.as_str() {
                                "approve" => true,
                                "reject" => false,
                                other => {
                                    return Err(format!(
                                        "decision must be approve or reject, got {}",
                                        other
                                    ))
                                }
                            };
                            Ok(Command::Approvals(ApprovalsCommand::Decide {
                                user_id: user_id.clone(),
                                approve,
                            }))
                        }
                        _ => Err("usage: approvals decide <user_id> <approve|reject>".to_string()),
                    }
                }
                other => Err(format!("unknown approvals subcommand: {}", other)),
            }
        }
        "call" => {
            if args.get(2).map(String::as_str) != Some("start") {
                return Err("usage: call start --question-set <id> <vulnerable_id>...".to_string());
            }
            let question_set = flag_value(args, "--question-set")
                .ok_or("call start requires --question-set <id>")?;
            let vulnerable_ids = positional(args, 3);
            if vulnerable_ids.is_empty() {
                return Err("call start requires at least one vulnerable id".to_string());
            }
            Ok(Command::CallStart {
                question_set,
                vulnerable_ids,
            })
        }
        "status" => Ok(Command::StatusWatch {
            updates: flag_value(args, "--updates")
                .and_then(|n| n.parse().ok())
                .unwrap_or(usize::MAX),
        }),
        "stats" => Ok(Command::Stats {
            round: flag_value(args, "--round").and_then(|r| r.parse().ok()),
        }),
        "dashboard" => Ok(Command::Dashboard),
        other => Err(format!("unknown command: {}", other)),
    }
}

fn run_command(cmd: Command) -> Result<()> {
    match cmd {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Version => {
            println!("callbot-admin-cli {}", VERSION);
            return Ok(());
        }
        _ => {}
    }

    let state = AppState::initialize(AppConfig::from_env()).map_err(|e| anyhow!("{}", e))?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    runtime.block_on(run_async(cmd, state))
}

/// Route-guard check the dashboard screens share
fn require_dashboard(state: &AppState, path: &str) -> Result<()> {
    match routes::resolve(path, state.session.has_session()) {
        RouteDecision::Proceed => Ok(()),
        RouteDecision::RedirectToLogin => {
            bail!("not signed in; run: callbot-admin-cli login <user_id> <password>")
        }
        RouteDecision::RedirectToDashboard => Ok(()),
    }
}

fn admin_id(state: &AppState) -> Result<String> {
    state
        .session
        .admin_id()
        .ok_or_else(|| anyhow!("not signed in"))
}

async fn run_async(cmd: Command, state: AppState) -> Result<()> {
    match cmd {
        Command::Help | Command::Version => unreachable!("handled before runtime start"),

        Command::Login { user_id, password } => {
            let form = LoginForm { user_id, password };
            match auth::login(&state.api, &form).await.map_err(|e| anyhow!("{}", e))? {
                LoginOutcome::SignedIn { admin_id, is_root } => {
                    println!(
                        "Signed in as {}{}",
                        admin_id,
                        if is_root { " (root admin)" } else { "" }
                    );
                }
                LoginOutcome::ApprovalPending => {
                    println!("Account is awaiting approval ({})", routes::APPROVAL_PENDING_PATH);
                }
            }
        }

        Command::Logout => {
            auth::logout(&state.api);
            println!("Signed out");
        }

        Command::Whoami => match state.session.current() {
            Some(session) => println!(
                "{}{} (since {})",
                session.admin_id,
                if session.is_root { " (root admin)" } else { "" },
                session.signed_in_at.format("%Y-%m-%d %H:%M UTC")
            ),
            None => println!("Not signed in"),
        },

        Command::Register {
            user_id,
            password,
            email,
            phone,
        } => {
            let form = RegisterForm {
                user_id,
                password_confirm: password.clone(),
                password,
                email,
                phone_number: phone,
            };
            auth::register(&state.api, &form).await.map_err(|e| anyhow!("{}", e))?;
            println!("Registration submitted; an administrator must approve the account");
        }

        Command::Vulnerable(sub) => {
            require_dashboard(&state, "/dashboard/vulnerable")?;
            let mut directory = VulnerableDirectory::new(Arc::clone(&state.api));
            directory.refresh().await.map_err(|e| anyhow!("{}", e))?;
            match sub {
                VulnerableCommand::List { search, page } => {
                    if let Some(term) = search {
                        directory.set_search(term);
                    }
                    directory.page = page;
                    let view = directory.visible();
                    println!(
                        "{} matching, page {}/{}",
                        view.total_items,
                        view.page,
                        view.total_pages.max(1)
                    );
                    for row in &view.items {
                        let gender = match row.gender {
                            Gender::Male => "M",
                            Gender::Female => "F",
                            Gender::Other => "O",
                        };
                        println!(
                            "{:<12} {:<12} {} {:<14} risks:{} desires:{} {}",
                            row.user_id,
                            row.name,
                            gender,
                            row.phone_number,
                            row.risk_list_size,
                            row.desire_list_size,
                            row.address.summary()
                        );
                    }
                }
                VulnerableCommand::Show { id } => {
                    let form = directory.open_edit(&id).await.map_err(|e| anyhow!("{}", e))?;
                    println!("{}", serde_json::to_string_pretty(&form_summary(&form))?);
                }
                VulnerableCommand::Delete { ids } => {
                    let report = directory.delete(&ids).await.map_err(|e| anyhow!("{}", e))?;
                    println!("Deleted {}/{}", report.deleted.len(), report.requested());
                    for (id, message) in &report.failed {
                        println!("  failed {}: {}", id, message);
                    }
                    if !report.all_succeeded() {
                        bail!("{} deletions failed", report.failed.len());
                    }
                }
                VulnerableCommand::Export => {
                    print!("{}", directory.export_csv());
                }
            }
        }

        Command::Questions(sub) => {
            require_dashboard(&state, "/dashboard/questions")?;
            let mut bank = QuestionBank::new(Arc::clone(&state.api));
            bank.refresh().await.map_err(|e| anyhow!("{}", e))?;
            match sub {
                QuestionsCommand::List { search } => {
                    if let Some(term) = search {
                        bank.set_search(term);
                    }
                    for set in &bank.visible().items {
                        println!(
                            "{:<12} v{:<3} {:>2} questions  {}",
                            set.questions_id,
                            set.version,
                            set.question_count(),
                            set.title
                        );
                    }
                }
                QuestionsCommand::Show { id } => {
                    let form = bank.open_edit(&id).await.map_err(|e| anyhow!("{}", e))?;
                    println!("{} (v{})", form.title, form.version);
                    for (i, step) in form.flow.iter().enumerate() {
                        println!("{:>2}. {}", i + 1, step.text);
                        for response in &step.expected_response {
                            println!("      - {}", response.text);
                        }
                    }
                }
            }
        }

        Command::History(sub) => {
            require_dashboard(&state, "/dashboard/history")?;
            let mut history = CallHistoryView::new(Arc::clone(&state.api));
            match sub {
                HistoryCommand::List { page, size, search } => {
                    history.query = HistoryQuery {
                        page,
                        size,
                        ..HistoryQuery::default()
                    };
                    if let Some(term) = search {
                        history.set_search(term);
                        history.query.page = page;
                    }
                    history.refresh().await.map_err(|e| anyhow!("{}", e))?;
                    println!(
                        "{} total, page {}/{}",
                        history.total_elements,
                        history.query.page + 1,
                        history.total_pages.max(1)
                    );
                    for row in history.rows() {
                        let time = row
                            .time
                            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_else(|| "-".to_string());
                        let result = row
                            .result
                            .map(|r| r.label().to_string())
                            .unwrap_or_else(|| "-".to_string());
                        println!(
                            "{:<12} {:<16} round {} {:<12} {:<18} {}",
                            row.id, time, row.s_index, row.v_name, result, row.q_title
                        );
                    }
                }
                HistoryCommand::Show { id } => {
                    let log = history.detail(&id).await.map_err(|e| anyhow!("{}", e))?;
                    println!("{}", serde_json::to_string_pretty(&log)?);
                }
            }
        }

        Command::Approvals(sub) => {
            require_dashboard(&state, "/dashboard/admin/approvals")?;
            let mut queue = ApprovalQueue::new(Arc::clone(&state.api));
            match sub {
                ApprovalsCommand::List => {
                    queue.refresh().await.map_err(|e| anyhow!("{}", e))?;
                    if queue.pending().is_empty() {
                        println!("No accounts awaiting approval");
                    }
                    for account in queue.pending() {
                        println!(
                            "{:<16} {:<28} {:<16} registered {}",
                            account.id,
                            account.email,
                            account.phone_number,
                            account.registered_at.format("%Y-%m-%d")
                        );
                    }
                }
                ApprovalsCommand::Decide { user_id, approve } => {
                    queue
                        .decide(&user_id, approve)
                        .await
                        .map_err(|e| anyhow!("{}", e))?;
                    println!(
                        "{} {}",
                        user_id,
                        if approve { "approved" } else { "rejected" }
                    );
                }
            }
        }

        Command::CallStart {
            question_set,
            vulnerable_ids,
        } => {
            require_dashboard(&state, "/dashboard/call")?;
            let admin = admin_id(&state)?;
            let mut planner = ConsultationPlanner::new(Arc::clone(&state.api));
            planner.load().await.map_err(|e| anyhow!("{}", e))?;
            for id in &vulnerable_ids {
                planner.roster.toggle(id, true);
            }
            planner.selected_question_set = Some(question_set);
            let seeds = planner.start(&admin).await.map_err(|e| anyhow!("{}", e))?;
            println!("Requested {} consultations", seeds.len());
            for item in &seeds {
                println!("  {} ({}) - {}", item.v_name, item.v_id, item.status);
            }
        }

        Command::StatusWatch { updates } => {
            require_dashboard(&state, "/dashboard/consultations/status")?;
            let admin = admin_id(&state)?;
            let mut status = StatusView::new(Arc::clone(&state.api));
            status.attach(&admin).await.map_err(|e| anyhow!("{}", e))?;
            print_board(&status);

            let mut seen = 0usize;
            while seen < updates && status.next_update().await {
                seen += 1;
                print_board(&status);
                if status.summary().total > 0
                    && status.summary().processed() == status.summary().total
                {
                    break;
                }
            }
            if !status.is_live() {
                println!("(stream closed; no further live updates)");
            }
            status.detach();
        }

        Command::Stats { round } => {
            require_dashboard(&state, "/dashboard/statistics")?;
            let mut statistics = StatisticsView::new(Arc::clone(&state.api));
            statistics.refresh().await.map_err(|e| anyhow!("{}", e))?;
            statistics.selected_round = round;

            let stats = statistics.stats();
            match round {
                Some(r) => println!("Round {} statistics", r),
                None => println!(
                    "All rounds ({:?} available)",
                    statistics.rounds()
                ),
            }
            println!("Total consultations: {}", stats.total_consultations);
            println!("Success rate: {:.1}%", stats.success_rate);
            println!(
                "Average runtime: {}m {}s",
                (stats.average_runtime / 60.0).round() as u64,
                (stats.average_runtime % 60.0).round() as u64
            );
            println!(
                "Results: not-possible {} / no-action {} / deep-dive {}",
                stats.by_result.not_possible,
                stats.by_result.no_action_needed,
                stats.by_result.deep_dive_needed
            );
            println!(
                "Human follow-up: none {} / requested {} / critical {}",
                stats.by_need_human.none,
                stats.by_need_human.requested,
                stats.by_need_human.critical
            );
            println!("Top risk types:");
            for row in statistics.top_risks() {
                println!("  {:>3}  {}", row.count, row.label);
            }
            println!("Top desire types:");
            for row in statistics.top_desires() {
                println!("  {:>3}  {}", row.count, row.label);
            }
        }

        Command::Dashboard => {
            require_dashboard(&state, "/dashboard")?;
            let mut statistics = StatisticsView::new(Arc::clone(&state.api));
            let summary = statistics.dashboard().await.map_err(|e| anyhow!("{}", e))?;
            println!("Today: {}  Total: {}", summary.today_count, summary.total_count);
            println!("Success rate: {:.1}%", summary.success_rate);
            println!(
                "Results: not-possible {} / no-action {} / deep-dive {}",
                summary.by_result.not_possible,
                summary.by_result.no_action_needed,
                summary.by_result.deep_dive_needed
            );
        }
    }

    Ok(())
}

fn print_board(status: &StatusView) {
    let summary = status.summary();
    println!(
        "-- {} total | waiting {} | in progress {} | completed {} | failed {} | {:.0}% --",
        summary.total,
        summary.waiting,
        summary.in_progress,
        summary.completed,
        summary.failed,
        summary.percent_complete()
    );
    for item in status.items() {
        let note = item
            .error_message
            .as_deref()
            .or(item.current_step.as_deref())
            .or(item.estimated_wait_time.as_deref())
            .unwrap_or("");
        println!("{:<12} {:<12} {:<12} {}", item.v_id, item.v_name, item.status, note);
    }
}

fn form_summary(form: &callbot_admin_lib::views::vulnerable::VulnerableForm) -> serde_json::Value {
    serde_json::json!({
        "user_id": form.user_id,
        "name": form.name,
        "birth_date": form.birth_date,
        "phone_number": form.phone_number,
        "address": {
            "state": form.state,
            "city": form.city,
            "address1": form.address1,
            "address2": form.address2,
        },
        "summary": form.summary,
    })
}

fn print_help() {
    println!(
        r#"callbot-admin-cli {}

USAGE:
  callbot-admin-cli <command> [options]

SESSION:
  login <user_id> <password>       Sign in and store the session
  logout                           Drop the stored session
  whoami                           Show the current session
  register <id> <pw> <email> <ph>  Request a new admin account

SCREENS:
  vulnerable list [--search <t>] [--page <n>]
  vulnerable show <id>
  vulnerable delete <id>...
  vulnerable export                CSV to stdout
  questions list [--search <t>]
  questions show <id>
  history list [--page <n>] [--size <n>] [--search <t>]
  history show <id>
  approvals list                   (root only)
  approvals decide <id> <approve|reject>
  call start --question-set <id> <vulnerable_id>...
  status [--updates <n>]           Watch live consultation status
  stats [--round <n>]
  dashboard

ENVIRONMENT:
  CALLBOT_API_BASE_URL             Backend base URL (default http://localhost:8080)
  CALLBOT_REQUEST_TIMEOUT_SECS     Request timeout (default 15)
  CALLBOT_DATA_DIR                 Session storage directory"#,
        VERSION
    );
}
