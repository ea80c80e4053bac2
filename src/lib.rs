pub mod core;
pub mod schemas;
pub mod services;
pub mod tasks;

mod console;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::anyhow;

use crate::core::config::Settings;
use crate::core::context::SessionContext;
use crate::core::telemetry;
use crate::core::time::{format_offset, now_utc};
use crate::services::api_client::ApiClient;
use crate::services::attempt_session::ExamAttemptSession;
use crate::tasks::countdown::CountdownPolicy;

/// Signs in with the configured credentials, then either takes the exam named by the first
/// argument, changes the password (`change-password`), or lists assigned exams and published
/// results.
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    crate::core::metrics::init(&settings)?;

    let mut client = ApiClient::from_settings(&settings)?;
    let credentials = settings.credentials();
    let context = client
        .login(&credentials.email, &credentials.password)
        .await
        .map_err(|err| anyhow!(err.user_message("Invalid email or password")))?;

    tracing::info!(
        api_url = %settings.api().base_url.as_str(),
        environment = %settings.runtime().environment.as_str(),
        "Examify client ready"
    );

    let result = match std::env::args().nth(1).as_deref() {
        Some("change-password") => change_password(&client, &credentials.password).await,
        Some(exam_id) => take_exam(&settings, client, context, exam_id.to_string()).await,
        None => overview(&client).await,
    };

    if let Some(rendered) = crate::core::metrics::render() {
        tracing::info!(metrics = %rendered, "Final metrics");
    }

    result
}

async fn take_exam(
    settings: &Settings,
    client: ApiClient,
    context: SessionContext,
    exam_id: String,
) -> anyhow::Result<()> {
    match client.exam_summary(&exam_id).await {
        Ok(exam) => println!("{} ({})", exam.title, exam.status_at(now_utc()).as_str()),
        Err(err) => tracing::warn!(exam_id = %exam_id, error = %err, "Exam summary unavailable"),
    }

    let session = Arc::new(
        ExamAttemptSession::new(
            exam_id,
            context,
            Arc::new(client),
            Arc::new(console::ConsoleObserver),
        )
        .with_default_duration_minutes(settings.attempt().default_duration_minutes),
    );

    session.start().await?;
    console::print_questions(&session.questions().await);

    let driver =
        tasks::countdown::spawn(&session, CountdownPolicy::from_settings(settings.attempt()));

    let result = tokio::select! {
        result = console::run(&session) => result,
        _ = crate::core::shutdown::shutdown_signal() => Ok(()),
    };

    session.teardown().await;
    if let Err(err) = driver.await {
        tracing::error!(error = %err, "Countdown task join failed");
    }

    tracing::info!(
        exam_id = %session.exam_id(),
        phase = session.phase().await.as_str(),
        "Leaving exam"
    );
    result
}

/// Reads the new password from the first line of stdin; the configured password is the old one.
async fn change_password(client: &ApiClient, old_password: &str) -> anyhow::Result<()> {
    let new_password = console::read_line("New password: ").await?.unwrap_or_default();
    let message = client
        .change_password(old_password, new_password.trim())
        .await
        .map_err(|err| anyhow!(err.user_message("Failed to update password")))?;
    println!("{}", message.as_deref().unwrap_or("Password updated successfully"));
    Ok(())
}

async fn overview(client: &ApiClient) -> anyhow::Result<()> {
    let now = now_utc();
    let exams = client
        .list_exams()
        .await
        .map_err(|err| anyhow!(err.user_message("Failed to load exams")))?;
    println!("Assigned exams:");
    for exam in &exams {
        println!(
            "  [{}] {} {} starts {}",
            exam.id,
            exam.title,
            exam.status_at(now).as_str(),
            format_offset(exam.start_time)
        );
    }

    let results = client
        .my_results()
        .await
        .map_err(|err| anyhow!(err.user_message("Failed to load results")))?;
    println!("Results:");
    for result in &results {
        println!(
            "  {}: {}/{} ({}%) {:?}",
            result.exam.title,
            result.obtained_marks,
            result.total_marks,
            result.percentage(),
            result.verdict()
        );
    }

    Ok(())
}
