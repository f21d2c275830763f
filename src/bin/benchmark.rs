use colored::*;
use governor::{Quota, RateLimiter};
use hdrhistogram::Histogram;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

const DURATION_SECS: u64 = 20;
const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const OWNER_PASSWORD: &str = "benchmark-password";

struct Target {
    name: &'static str,
    method: &'static str,
    url: String,
    tenant_slug: Option<String>,
    body: Option<Value>,
}

struct Outcome {
    latency: Duration,
    success: bool,
    limited: bool,
}

#[tokio::main]
async fn main() {
    let base_url = std::env::var("BENCH_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let Ok(platform_key) = std::env::var("PLATFORM_ADMIN_KEY") else {
        eprintln!("{}", "❌ PLATFORM_ADMIN_KEY must be set to create the benchmark tenant.".red().bold());
        return;
    };

    println!("{}", "🚀 Starting Benchmark Suite".bold().green());
    println!("Target URL: {}", base_url);

    let client = Client::builder()
        .pool_max_idle_per_host(1000)
        .timeout(Duration::from_secs(10))
        .cookie_store(true)
        .build()
        .unwrap();

    if client.get(format!("{}/health", base_url)).send().await.is_err() {
        eprintln!("{}", format!("❌ Server is NOT reachable at {}. Please start it first.", base_url).red().bold());
        return;
    }

    println!("\n{}", "⚙️  Setting up benchmark data...".yellow());
    let (slug, phone) = setup_tenant(&client, &base_url, &platform_key).await;
    login(&client, &base_url, &slug, &phone).await;
    setup_orders(&client, &base_url, &slug, 25).await;

    println!("{}", "✅ Data created successfully.".green());
    println!("   Tenant slug: {}", slug);
    println!("   Owner phone: {}", phone);

    let targets = vec![
        Target {
            name: "Health Check (Public)",
            method: "GET",
            url: format!("{}/health", base_url),
            tenant_slug: None,
            body: None,
        },
        Target {
            name: "List Orders (Scoped Read)",
            method: "GET",
            url: format!("{}/api/orders", base_url),
            tenant_slug: Some(slug.clone()),
            body: None,
        },
        Target {
            name: "Login Flow (Crypto Intensive)",
            method: "POST",
            url: format!("{}/api/auth/login", base_url),
            tenant_slug: Some(slug.clone()),
            body: Some(json!({ "phone": phone, "password": OWNER_PASSWORD })),
        },
    ];

    let rps_stages = vec![10, 50, 200, 1000];

    for target in targets {
        println!("\n{}", "=".repeat(72));
        println!("Benchmarking Endpoint: {}", target.name.cyan().bold());
        println!("URL: {}", target.url);
        println!("{}", "=".repeat(72));

        println!("{:<10} | {:<15} | {:<15} | {:<12} | {:<10}", "RPS", "Mean (ms)", "P99 (ms)", "Success", "429s");
        println!("{:-<10}-+-{:-<15}-+-{:-<15}-+-{:-<12}-+-{:-<10}", "", "", "", "", "");

        for &rps in &rps_stages {
            run_stage(&client, &target, rps).await;
        }
    }
}

async fn setup_tenant(client: &Client, base_url: &str, platform_key: &str) -> (String, String) {
    let id = Uuid::new_v4();
    let slug = format!("bench-{}", &id.simple().to_string()[..12]);
    let phone = format!("9{:08}", id.as_u128() % 100_000_000);

    let res = client.post(format!("{}/api/admin/tenants", base_url))
        .header("X-Platform-Key", platform_key)
        .json(&json!({
            "slug": slug,
            "name": "Benchmark Logistics",
            "owner": { "phone": phone, "password": OWNER_PASSWORD, "name": "Bench Bot" }
        }))
        .send()
        .await
        .expect("Failed to send tenant create request");

    if !res.status().is_success() {
        let status = res.status();
        let txt = res.text().await.unwrap_or_default();
        panic!("Failed to create tenant. Status: {}. Body: {}", status, txt);
    }
    (slug, phone)
}

async fn login(client: &Client, base_url: &str, slug: &str, phone: &str) {
    let res = client.post(format!("{}/api/auth/login", base_url))
        .header("X-Tenant-Slug", slug)
        .json(&json!({ "phone": phone, "password": OWNER_PASSWORD }))
        .send()
        .await
        .expect("Login failed during setup");

    if !res.status().is_success() {
        panic!("Login failed. Status: {}", res.status());
    }
}

async fn setup_orders(client: &Client, base_url: &str, slug: &str, count: usize) {
    for i in 0..count {
        let res = client.post(format!("{}/api/orders", base_url))
            .header("X-Tenant-Slug", slug)
            .json(&json!({
                "number": format!("BENCH-{:04}", i),
                "customerName": "Load Test Sp. z o.o.",
                "totalCents": 1000 + i as i64
            }))
            .send()
            .await
            .expect("Failed to create order");

        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().await.unwrap_or_default();
            panic!("Failed to create order data. Status: {}. Body: {}", status, txt);
        }
    }
}

async fn run_stage(client: &Client, target: &Target, rps: u32) {
    let limiter = Arc::new(RateLimiter::direct(
        Quota::per_second(NonZeroU32::new(rps).unwrap())
    ));

    let (tx, mut rx) = mpsc::channel::<Outcome>(50000);
    let start_time = Instant::now();
    let duration = Duration::from_secs(DURATION_SECS);

    loop {
        if start_time.elapsed() > duration {
            break;
        }

        if limiter.check().is_ok() {
            let client = client.clone();
            let url = target.url.clone();
            let body = target.body.clone();
            let slug = target.tenant_slug.clone();
            let method = target.method;
            let tx = tx.clone();

            tokio::spawn(async move {
                let req_start = Instant::now();
                let mut req = match method {
                    "POST" => client.post(&url),
                    _ => client.get(&url),
                };
                if let Some(slug) = slug {
                    req = req.header("X-Tenant-Slug", slug);
                }
                if let Some(b) = body {
                    req = req.json(&b);
                }
                let res = req.send().await;
                let latency = req_start.elapsed();

                let (success, limited) = match res {
                    Ok(r) => (r.status().is_success(), r.status() == StatusCode::TOO_MANY_REQUESTS),
                    Err(_) => (false, false),
                };

                let _ = tx.send(Outcome { latency, success, limited }).await;
            });
        } else {
            tokio::task::yield_now().await;
        }
    }

    drop(tx);

    let mut histogram = Histogram::<u64>::new(3).unwrap();
    let mut successes = 0;
    let mut limited = 0;
    let mut total = 0;

    while let Some(outcome) = rx.recv().await {
        total += 1;
        if outcome.success { successes += 1; }
        if outcome.limited { limited += 1; }
        histogram.record(outcome.latency.as_micros() as u64).unwrap();
    }

    let mean_ms = histogram.mean() / 1000.0;
    let p99_ms = histogram.value_at_quantile(0.99) as f64 / 1000.0;
    let success_rate = if total > 0 { (successes as f64 / total as f64) * 100.0 } else { 0.0 };

    println!(
        "{:<10} | {:<15.2} | {:<15.2} | {:<11.1}% | {:<10}",
        rps,
        mean_ms,
        p99_ms,
        success_rate,
        limited
    );

    tokio::time::sleep(Duration::from_millis(500)).await;
}
