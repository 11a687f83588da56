use crate::infra::CliStore;
use chrono::NaiveDate;
use clap::Args;
use license_renewal::config::AppConfig;
use license_renewal::error::AppError;
use license_renewal::workflows::renewal::{
    CompletedProcess, DeliveryAddressPatch, LicenseInformationPatch, LicenseType,
    PaymentSimulator, ProcessDraft, ProcessStatus, ProcessType, RenewalYears, TestResult, TestType,
    UserProfilePatch, VerificationSimulator, VerificationStep,
};
use std::collections::BTreeSet;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Amount charged by the simulated payment
    #[arg(long, default_value_t = 100.0)]
    pub(crate) amount: f64,
    /// License class to renew (A, B, C, M or E)
    #[arg(long, default_value = "B", value_parser = parse_license_type)]
    pub(crate) license_type: LicenseType,
    /// Renewal period in years (1-5)
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub(crate) years: u8,
    /// Applicant birth date (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) born_date: Option<NaiveDate>,
    /// Request a replacement card in addition to the renewal
    #[arg(long)]
    pub(crate) replacement: bool,
    /// Stop after payment without recording vision tests or verifications
    #[arg(long)]
    pub(crate) skip_checks: bool,
}

fn parse_license_type(raw: &str) -> Result<LicenseType, String> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "A" => Ok(LicenseType::A),
        "B" => Ok(LicenseType::B),
        "C" => Ok(LicenseType::C),
        "M" => Ok(LicenseType::M),
        "E" => Ok(LicenseType::E),
        _ => Err(format!("unknown license type '{raw}' (expected A, B, C, M or E)")),
    }
}

pub(crate) async fn run_demo(
    store: &CliStore,
    config: &AppConfig,
    args: DemoArgs,
) -> Result<(), AppError> {
    let DemoArgs {
        amount,
        license_type,
        years,
        born_date,
        replacement,
        skip_checks,
    } = args;

    let renewal_years = RenewalYears::try_from(years)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;
    let born_date = born_date.or_else(|| NaiveDate::from_ymd_opt(1990, 6, 15));

    println!("License renewal demo");

    store
        .update_user_profile(UserProfilePatch {
            email: Some("ana.garcia@example.com".to_string()),
            phone_number: Some("5555-0101".to_string()),
            country_code: Some("+502".to_string()),
        })
        .await;

    let mut process_types = BTreeSet::from([ProcessType::Renewal]);
    if replacement {
        process_types.insert(ProcessType::Replacement);
    }
    store.update_process_types(process_types).await;
    store
        .update_license_information(LicenseInformationPatch {
            dpi: Some("2456 78901 0101".to_string()),
            names: Some("Ana Lucía".to_string()),
            last_names: Some("García López".to_string()),
            license_type: Some(license_type),
            renewal_years: Some(renewal_years),
            born_date: Some(born_date),
        })
        .await;
    store
        .update_delivery_address(DeliveryAddressPatch {
            street_address: Some("6a Avenida 12-34, Zona 1".to_string()),
            apartment: Some("Apto 3B".to_string()),
            city: Some("Guatemala".to_string()),
            state: Some("Guatemala".to_string()),
            zip_code: Some("01001".to_string()),
        })
        .await;
    render_draft(&store.process_data());

    println!("\nProcessing payment of Q{amount:.2}...");
    let payments = PaymentSimulator::from_config(&config.simulation);
    let id = payments.pay(store, amount).await?;
    println!("- Payment accepted; process {id} submitted");

    if !skip_checks {
        println!("\nVision tests");
        let results = [
            (TestType::Colorblind, 2, 4),
            (TestType::DepthPerception, 3, 3),
            (TestType::Myopia, 5, 5),
        ];
        for (test_type, score, total_questions) in results {
            let result = TestResult {
                score,
                total_questions,
                passed: score * 2 > total_questions,
            };
            store.save_test_results(&id, test_type, result).await;
            println!(
                "- {}: {}/{} ({})",
                test_type.label(),
                score,
                total_questions,
                if result.passed { "passed" } else { "failed" }
            );
        }

        println!("\nVerifications");
        let checks = VerificationSimulator::from_config(&config.simulation);
        checks.verify_documents(store, &id).await?;
        println!("- {} complete", VerificationStep::DocumentVerification.label());
        checks.verify_transit(store, &id).await?;
        println!("- {} complete", VerificationStep::TransitVerification.label());
        checks.advance_status(store, &id).await?;
    }

    if let Some(process) = store.completed_process(&id) {
        println!();
        render_process(&process);
    }

    Ok(())
}

pub(crate) fn run_status(store: &CliStore) {
    let profile = store.user_profile();
    println!("Profile");
    if profile.email.is_empty() {
        println!("- not signed in");
    } else {
        println!(
            "- {} | {} {}",
            profile.email, profile.country_code, profile.phone_number
        );
    }

    println!();
    render_draft(&store.process_data());

    let processes = store.completed_processes();
    println!(
        "\nSubmitted processes: {} (active: {})",
        processes.len(),
        if store.has_active_processes() { "yes" } else { "no" }
    );
    if !processes.is_empty() {
        let summary: Vec<String> = status_counts(&processes)
            .into_iter()
            .map(|(status, count)| format!("{} {}", status.label(), count))
            .collect();
        println!("- {}", summary.join(" | "));
    }
    for process in &processes {
        println!();
        render_process(process);
    }
}

pub(crate) async fn run_logout(store: &CliStore) {
    store.logout().await;
    println!("Signed out; all workflow records removed.");
}

fn render_draft(draft: &ProcessDraft) {
    if draft == &ProcessDraft::default() {
        println!("Draft: none in progress");
        return;
    }

    let info = &draft.license_information;
    let types: Vec<&str> = draft.process_types.iter().map(|t| t.label()).collect();
    println!("Draft");
    println!("- Process: {}", join_or_dash(&types));
    println!(
        "- Applicant: {} {} (DPI {})",
        info.names, info.last_names, info.dpi
    );
    println!(
        "- License: {} for {} year(s)",
        info.license_type.label(),
        info.renewal_years.years()
    );
    if let Some(born_date) = info.born_date {
        println!("- Born: {}", born_date.format("%Y-%m-%d"));
    }
    let address = &draft.delivery_address;
    println!(
        "- Deliver to: {} {}, {}, {} {}",
        address.street_address, address.apartment, address.city, address.state, address.zip_code
    );
}

fn render_process(process: &CompletedProcess) {
    let types: Vec<&str> = process
        .draft
        .process_types
        .iter()
        .map(|t| t.label())
        .collect();
    println!("Process {} [{}]", process.id, process.status.label());
    println!("- Type: {}", join_or_dash(&types));
    println!(
        "- Paid Q{:.2} on {} | delivery by {}",
        process.amount,
        process.payment_date.format("%Y-%m-%d"),
        process.estimated_delivery_date.format("%Y-%m-%d")
    );
    for step in VerificationStep::ordered() {
        let mark = if process.is_step_completed(step) { "x" } else { " " };
        println!("  [{mark}] {}", step.label());
    }
    for test_type in TestType::ordered() {
        match process.test_results.get(test_type) {
            Some(result) => println!(
                "    {}: {}/{}{}",
                test_type.label(),
                result.score,
                result.total_questions,
                if result.passed { "" } else { " (failed)" }
            ),
            None => println!("    {}: pending", test_type.label()),
        }
    }
}

fn status_counts(processes: &[CompletedProcess]) -> Vec<(ProcessStatus, usize)> {
    ProcessStatus::ordered()
        .into_iter()
        .map(|status| {
            let count = processes
                .iter()
                .filter(|process| process.status == status)
                .count();
            (status, count)
        })
        .collect()
}

fn join_or_dash(values: &[&str]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(" + ")
    }
}
