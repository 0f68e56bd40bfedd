//! Command-line stand-in for the dashboard pages: wires user commands to the
//! shared client runtime. Gateway errors are rendered as text, never fatal.

use anyhow::Result;

use riskdeck::access;
use riskdeck::api::{ApiClient, FeaturePayload, GlobalExplain, ModelInfo, ScoreResponse};
use riskdeck::chart;
use riskdeck::config::Config;
use riskdeck::history::{self, export_rows, to_csv, HistoryEntry, Ledger, ReportSnapshot};
use riskdeck::logging::{json_log, obj, v_str};
use riskdeck::session::{Environment, Guard, Session, Theme};
use riskdeck::store::{shared, SharedStore, SqliteStore};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cfg = Config::from_env();
    let store = shared(SqliteStore::open(&cfg.store_path)?);
    let session = Session::new(store.clone());
    let ledger = Ledger::with_capacity(store.clone(), cfg.history_capacity);
    let client = ApiClient::new(cfg);

    let cmd = args.first().map(String::as_str).unwrap_or("help");
    match cmd {
        "login" => {
            let email = args.get(1).cloned().unwrap_or_default();
            let password = args.get(2).cloned().unwrap_or_default();
            if session.login(&email, &password)? {
                json_log("session", obj(&[("event", v_str("login"))]));
                println!("Logged in. Theme: {}", session.theme().as_str());
            } else {
                println!("Enter any email + password (demo auth).");
            }
        }
        "logout" => {
            session.logout()?;
            json_log("session", obj(&[("event", v_str("logout"))]));
            println!("Logged out.");
        }
        "theme" => match args.get(1).map(String::as_str) {
            Some("toggle") | None => println!("Theme: {}", session.toggle_theme()?.as_str()),
            Some(v) => {
                session.set_theme(Theme::parse(v))?;
                println!("Theme: {}", session.theme().as_str());
            }
        },
        "env" => {
            if let Some(v) = args.get(1) {
                session.set_environment(Environment::parse(v))?;
            }
            let env = session.environment();
            println!("{} — {}", env.label(), env.hint());
        }
        "key" => {
            if let Some(v) = args.get(1) {
                session.set_api_key(v)?;
                // Quick check that the key is accepted; failures show up on
                // the next real request.
                client.ping_auth(&session).await;
            }
            println!("{}", session.key_status());
        }
        "help" | "--help" => usage(),
        other => {
            // Everything below is a protected page.
            if let Guard::Redirect(to) = session.guard("/app") {
                println!("Not logged in. Run `riskdeck login <email> <password>` (redirect: {}).", to);
                return Ok(());
            }
            if let Err(err) = run_protected(other, &args, &client, &session, &ledger, &store).await {
                println!("{}", err);
            }
        }
    }
    Ok(())
}

async fn run_protected(
    cmd: &str,
    args: &[String],
    client: &ApiClient,
    session: &Session,
    ledger: &Ledger,
    store: &SharedStore,
) -> Result<()> {
    match cmd {
        "status" => {
            let env = session.environment();
            println!("Environment: {} — {}", env.label(), env.hint());
            println!("Theme: {}", session.theme().as_str());
            println!("{}", session.key_status());
            let state = access::apply(client, session).await;
            for line in &state.diagnostics {
                println!("{}", line);
            }
        }
        "score" | "explain" => {
            let payload = if args.iter().any(|a| a == "--high") {
                FeaturePayload::seed_high()
            } else {
                FeaturePayload::seed_low()
            };
            let state = access::apply(client, session).await;
            if !state.controls_enabled {
                for line in &state.diagnostics {
                    println!("{}", line);
                }
                return Ok(());
            }
            if cmd == "score" {
                do_score(client, session, ledger, store, payload).await?;
            } else {
                do_explain(client, session, ledger, store, payload).await?;
            }
        }
        "global" => {
            let raw = client.global_explain(session).await?;
            history::save_last_global(store, &raw)?;
            let g = GlobalExplain::from_value(&raw);
            let items: Vec<chart::SeriesItem> = g
                .items
                .iter()
                .map(|it| chart::SeriesItem::new(it.feature.clone(), it.importance_percent))
                .collect();
            print_bars(&items);
        }
        "model-info" => {
            let raw = client.model_info(session).await?;
            let info = ModelInfo::from_value(&raw);
            println!("Model: {}", info.model_type.as_deref().unwrap_or("—"));
            println!("Version: {}", info.model_version.as_deref().unwrap_or("—"));
            println!("AUC: {}", fmt_opt(info.metrics.test.auc, 4));
            println!("Brier: {}", fmt_opt(info.metrics.test.brier, 4));
        }
        "history" => match args.get(1).map(String::as_str) {
            Some("clear") => {
                ledger.clear()?;
                println!("History cleared.");
            }
            query => {
                let (q, label) = query_args(query, args);
                let items = ledger.filter(&q, label.as_deref());
                if items.is_empty() {
                    println!("No matching requests.");
                }
                for (i, it) in items.iter().enumerate() {
                    println!(
                        "{:>3}  {}  {:<5}  {:<10}  {}  {} warn",
                        i,
                        it.ts,
                        it.env.label(),
                        it.risk_label.as_deref().unwrap_or("—"),
                        fmt_opt(it.risk_probability, 4),
                        it.warnings.len()
                    );
                }
            }
        },
        "replay" => {
            let index: usize = args.get(1).and_then(|v| v.parse().ok()).unwrap_or(0);
            match ledger.replay(index) {
                Some(it) => {
                    println!("Input: {}", serde_json::to_string_pretty(&it.input)?);
                    if let Some(score) = &it.score {
                        print_result(&ScoreResponse::from_value(score));
                    }
                    if let Some(explain) = &it.explain {
                        print_top_features(&ScoreResponse::from_value(explain));
                    }
                    if let Some(global) = &it.global_explain {
                        let g = GlobalExplain::from_value(global);
                        let items: Vec<chart::SeriesItem> = g
                            .items
                            .iter()
                            .map(|it| chart::SeriesItem::new(it.feature.clone(), it.importance_percent))
                            .collect();
                        print_bars(&items);
                    }
                }
                None => println!("No entry at index {}.", index),
            }
        }
        "export" => {
            let file = args
                .get(1)
                .filter(|a| !a.starts_with("--"))
                .cloned()
                .unwrap_or_else(|| "decision_audit.csv".to_string());
            let (q, label) = query_args(args.get(2).map(String::as_str), args);
            let items = ledger.filter(&q, label.as_deref());
            std::fs::write(&file, to_csv(&export_rows(&items)))?;
            println!("Wrote {} rows to {}.", items.len(), file);
        }
        "report" => match history::load_report(store) {
            Some(report) => {
                println!("Generated: {}  ({})", report.generated_at, report.env.label());
                println!("Input: {}", serde_json::to_string_pretty(&report.input)?);
                if let Some(score) = &report.score {
                    print_result(&ScoreResponse::from_value(score));
                }
                match &report.explain {
                    Some(explain) => print_top_features(&ScoreResponse::from_value(explain)),
                    None => println!("No explain data found."),
                }
            }
            None => println!("No report data found. Run score + explain first."),
        },
        _ => usage(),
    }
    Ok(())
}

async fn do_score(
    client: &ApiClient,
    session: &Session,
    ledger: &Ledger,
    store: &SharedStore,
    payload: FeaturePayload,
) -> Result<()> {
    let raw = client.score(session, &payload).await?;
    print_result(&ScoreResponse::from_value(&raw));
    ledger.append(
        HistoryEntry::from_response(session.environment(), payload, &raw, false)
            .with_global(history::load_last_global(store)),
    )?;
    Ok(())
}

async fn do_explain(
    client: &ApiClient,
    session: &Session,
    ledger: &Ledger,
    store: &SharedStore,
    payload: FeaturePayload,
) -> Result<()> {
    let raw = client.explain(session, &payload).await?;
    let view = ScoreResponse::from_value(&raw);
    print_result(&view);
    print_top_features(&view);

    ledger.append(
        HistoryEntry::from_response(session.environment(), payload.clone(), &raw, true)
            .with_global(history::load_last_global(store)),
    )?;

    history::save_report(
        store,
        &ReportSnapshot {
            env: session.environment(),
            generated_at: riskdeck::logging::ts_now(),
            input: payload,
            score: Some(raw.clone()),
            explain: Some(raw),
        },
    )?;
    Ok(())
}

fn print_result(view: &ScoreResponse) {
    println!("Probability: {}", fmt_opt(view.probability(), 4));
    println!("Label: {}", view.risk_label.as_deref().unwrap_or("—"));
    println!("Model: {}", view.model_version.as_deref().unwrap_or("—"));
    if view.warnings.is_empty() {
        println!("No warnings");
    } else {
        for w in &view.warnings {
            println!("warn: {}", w);
        }
    }
}

fn print_top_features(view: &ScoreResponse) {
    let features = view
        .explanation
        .as_ref()
        .map(|e| e.top_features.as_slice())
        .unwrap_or_default();
    if features.is_empty() {
        println!("No explanation yet.");
        return;
    }
    for f in features {
        println!(
            "{:<32} {:>6.1}%  {:<15} {:+.4}",
            f.feature, f.contribution_percent, f.direction, f.shap_value
        );
    }
}

/// Text rendering of the shared bar layout: one row per bar, fill width
/// proportional to the computed pixel geometry.
fn print_bars(items: &[chart::SeriesItem]) {
    let chart = chart::layout(72.0, 300.0, 1.0, items);
    if let Some(msg) = &chart.empty_message {
        println!("{}", msg);
        return;
    }
    for bar in &chart.bars {
        let cells = ((bar.fill_width / bar.track_width) * 40.0).round() as usize;
        println!("{:<32} {:<40} {}", bar.label, "#".repeat(cells), bar.value_text);
    }
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(v) => format!("{:.*}", decimals, v),
        None => "—".to_string(),
    }
}

/// `[query] [--label L]` tail shared by history and export.
fn query_args(query: Option<&str>, args: &[String]) -> (String, Option<String>) {
    let q = query
        .filter(|v| !v.starts_with("--"))
        .map(str::to_string)
        .unwrap_or_default();
    let label = args
        .iter()
        .position(|a| a == "--label")
        .and_then(|i| args.get(i + 1))
        .cloned();
    (q, label)
}

fn usage() {
    println!("riskdeck — fraud scoring dashboard client");
    println!();
    println!("  login <email> <password>   demo login (any non-empty pair)");
    println!("  logout");
    println!("  theme [dark|light|toggle]");
    println!("  env [dev|stage|prod]");
    println!("  key <api-key>");
    println!("  status");
    println!("  score [--high]             score a seeded payload");
    println!("  explain [--high]           score + explanation, saves report");
    println!("  global                     global feature importances");
    println!("  model-info");
    println!("  history [query] [--label L] | history clear");
    println!("  replay <index>");
    println!("  export [file] [query] [--label L]");
    println!("  report");
}
