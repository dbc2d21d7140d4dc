use anyhow::Context;
use api_shared::{AppointmentDto, FileRecordDto, FileRecordsRes, HashRes, PatientRecordRes, SummaryRes};
use clap::{Args, Parser, Subcommand};
use prs_core::{
    resolve_core_config, Appointment, BlobContent, BloodGroup, FileRecord, IdentifierHash,
    IntakeForm, Medication, NationalId, NonEmptyText, PatientRecordService, Prescription,
    ReportUpload, StaffSession, TextList,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "prs")]
#[command(about = "Patient Record Store CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// The acting staff member, for commands that attribute work to someone.
#[derive(Args)]
struct StaffArgs {
    /// Staff member performing the action
    #[arg(long, env = "PRS_STAFF_NAME")]
    staff: String,
    /// Facility used as the blob path prefix (defaults to PRS_FACILITY)
    #[arg(long)]
    facility: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the identifier hash of a national ID
    Hash {
        /// Raw national ID
        national_id: String,
    },
    /// Look up a patient by national ID
    Lookup {
        /// Raw national ID
        national_id: String,
    },
    /// Register a new patient
    Intake(Box<IntakeArgs>),
    /// List a patient's documents
    Files {
        /// Identifier hash
        hash: String,
    },
    /// Add an already-hosted document to a patient
    AddFile {
        /// Identifier hash
        hash: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        doctor: String,
        /// Document type label, e.g. LabReport
        #[arg(long = "type")]
        kind: String,
        /// Document date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
    },
    /// Upload a report file and attach it to a patient
    UploadReport {
        /// Identifier hash
        hash: String,
        /// File to upload
        file: PathBuf,
        /// Report type label, e.g. LabReport
        #[arg(long = "type")]
        kind: String,
        /// Report date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Attributed doctor (defaults to --staff)
        #[arg(long)]
        doctor: Option<String>,
        /// Content type (detected from the bytes when omitted)
        #[arg(long)]
        content_type: Option<String>,
        #[command(flatten)]
        staff: StaffArgs,
    },
    /// Submit a prescription for a patient
    Prescribe(Box<PrescribeArgs>),
    /// Book a follow-up appointment for a patient
    Appoint {
        /// Identifier hash
        hash: String,
        /// Appointment date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        #[arg(long, default_value = "")]
        doctor: String,
        #[arg(long, default_value = "")]
        specialty: String,
        #[arg(long, default_value = "")]
        next_step: String,
    },
    /// Summarise documents by URL, or every document of one patient
    Summarize {
        /// Document URLs
        urls: Vec<String>,
        /// Summarise all documents of this patient instead
        #[arg(long, conflicts_with = "urls")]
        patient: Option<String>,
    },
}

#[derive(Args)]
struct IntakeArgs {
    /// Raw national ID
    national_id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    age: Option<String>,
    #[arg(long)]
    city: Option<String>,
    /// Date of birth (YYYY-MM-DD)
    #[arg(long)]
    dob: Option<String>,
    #[arg(long)]
    mobile: Option<String>,
    #[arg(long)]
    blood_type: Option<String>,
    /// Past disease (repeatable)
    #[arg(long = "past-disease")]
    past_disease: Vec<String>,
    /// Past diseases as a comma-separated list
    #[arg(long)]
    past_diseases: Option<String>,
    /// Allergy (repeatable)
    #[arg(long = "allergy")]
    allergy: Vec<String>,
    /// Allergies as a comma-separated list
    #[arg(long)]
    allergies: Option<String>,
    /// Ongoing medication (repeatable)
    #[arg(long = "medication")]
    medication: Vec<String>,
    /// Ongoing medications as a comma-separated list
    #[arg(long)]
    medications: Option<String>,
    #[arg(long)]
    blood_pressure: Option<String>,
    #[arg(long)]
    heart_rate: Option<String>,
    #[arg(long)]
    respiratory_rate: Option<String>,
    #[arg(long)]
    temperature: Option<String>,
    #[arg(long)]
    oxygen_saturation: Option<String>,
}

#[derive(Args)]
struct PrescribeArgs {
    /// Identifier hash
    hash: String,
    #[arg(long)]
    symptoms: Option<String>,
    #[arg(long)]
    diagnosis: Option<String>,
    #[arg(long)]
    height: Option<String>,
    #[arg(long)]
    weight: Option<String>,
    /// One of A+ A- B+ B- O+ O- AB+ AB-
    #[arg(long)]
    blood_group: Option<BloodGroupArg>,
    /// Medication as `name|dose|time to eat` (repeatable)
    #[arg(long = "medication")]
    medications: Vec<String>,
    #[arg(long)]
    next_doctor: Option<String>,
    #[arg(long)]
    next_specialty: Option<String>,
    #[arg(long)]
    next_date: Option<String>,
    #[arg(long)]
    next_step: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    #[command(flatten)]
    staff: StaffArgs,
}

#[derive(Clone)]
struct BloodGroupArg(BloodGroup);

impl std::str::FromStr for BloodGroupArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<BloodGroup>()
            .map(BloodGroupArg)
            .map_err(|e| e.to_string())
    }
}

/// Combines repeated flags with a delimited list into one cleaned list.
fn list_arg(repeated: Vec<String>, delimited: Option<String>) -> TextList {
    let mut list = TextList::from_entries(repeated);
    if let Some(delimited) = delimited {
        for entry in TextList::parse_delimited(&delimited, ',').iter() {
            list.push(entry.clone());
        }
    }
    list
}

fn parse_medication(entry: &str) -> Option<Medication> {
    let mut parts = entry.splitn(3, '|');
    let name = parts.next().unwrap_or_default();
    let dose = parts.next().unwrap_or_default();
    let time_to_eat = parts.next().unwrap_or_default();
    Medication::from_row(name, dose, time_to_eat)
}

fn parse_hash(raw: &str) -> anyhow::Result<IdentifierHash> {
    IdentifierHash::parse(raw.trim()).context("invalid identifier hash")
}

fn session(
    staff: StaffArgs,
    service_default: &NonEmptyText,
) -> anyhow::Result<StaffSession> {
    StaffSession::from_parts(&staff.staff, staff.facility.as_deref(), service_default)
        .context("--staff cannot be blank")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("prs=warn".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'prs --help' for commands");
        return Ok(());
    };

    if let Commands::Hash { national_id } = &command {
        let hash = NationalId::from_entry(national_id)?.hash();
        return print_json(&HashRes {
            identifier_hash: hash.to_string(),
        });
    }

    let cfg = Arc::new(resolve_core_config(|key| std::env::var(key).ok())?);
    let default_facility = cfg.default_facility().clone();
    let service = PatientRecordService::new(cfg)?;

    match command {
        Commands::Hash { .. } => {}
        Commands::Lookup { national_id } => {
            match service.lookup(&NationalId::from_entry(&national_id)?)? {
                Some(record) => print_json(&PatientRecordRes::from(record))?,
                None => println!("No patient found."),
            }
        }
        Commands::Intake(args) => {
            let args = *args;
            let mut form = IntakeForm::new(NationalId::from_entry(&args.national_id)?);
            form.name = args.name;
            form.email = args.email;
            form.age = args.age;
            form.city = args.city;
            form.date_of_birth = args.dob;
            form.mobile_number = args.mobile;
            form.blood_type = args.blood_type;
            form.past_diseases = list_arg(args.past_disease, args.past_diseases);
            form.allergies = list_arg(args.allergy, args.allergies);
            form.ongoing_medication = list_arg(args.medication, args.medications);
            form.vitals.blood_pressure = args.blood_pressure;
            form.vitals.heart_rate = args.heart_rate;
            form.vitals.respiratory_rate = args.respiratory_rate;
            form.vitals.temperature = args.temperature;
            form.vitals.oxygen_saturation = args.oxygen_saturation;

            let record = service.intake(form)?;
            print_json(&PatientRecordRes::from(record))?;
        }
        Commands::Files { hash } => {
            let records = service.file_records(&parse_hash(&hash)?)?;
            if records.is_empty() {
                println!("No documents found.");
            } else {
                print_json(&FileRecordsRes::from(records))?;
            }
        }
        Commands::AddFile {
            hash,
            url,
            doctor,
            kind,
            date,
        } => {
            let record = service.add_document(
                &parse_hash(&hash)?,
                FileRecord::new(url, doctor, kind, date),
            )?;
            print_json(&FileRecordDto::from(record))?;
        }
        Commands::UploadReport {
            hash,
            file,
            kind,
            date,
            doctor,
            content_type,
            staff,
        } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            tracing::debug!(bytes = bytes.len(), file = %file.display(), "read report file");
            let upload = ReportUpload {
                report_type: kind,
                date,
                doctor,
                content: BlobContent::Bytes(bytes),
                content_type,
                file_extension: file
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_string),
            };
            let session = session(staff, &default_facility)?;
            let record = service.upload_report(&session, &parse_hash(&hash)?, upload)?;
            print_json(&FileRecordDto::from(record))?;
        }
        Commands::Prescribe(args) => {
            let args = *args;
            let mut prescription = Prescription {
                symptoms: NonEmptyText::optional(args.symptoms),
                diagnosis: NonEmptyText::optional(args.diagnosis),
                height: NonEmptyText::optional(args.height),
                weight: NonEmptyText::optional(args.weight),
                blood_group: args.blood_group.map(|g| g.0),
                medications: args
                    .medications
                    .iter()
                    .filter_map(|m| parse_medication(m))
                    .collect(),
                next_appointment: None,
                doctor_notes: NonEmptyText::optional(args.notes),
            };
            prescription.set_next_appointment(Appointment {
                doctor: args.next_doctor.unwrap_or_default(),
                specialty: args.next_specialty.unwrap_or_default(),
                date: args.next_date.unwrap_or_default(),
                next_step: args.next_step.unwrap_or_default(),
            });

            let session = session(args.staff, &default_facility)?;
            let record =
                service.submit_prescription(&session, &parse_hash(&args.hash)?, &prescription)?;
            print_json(&FileRecordDto::from(record))?;
        }
        Commands::Appoint {
            hash,
            date,
            doctor,
            specialty,
            next_step,
        } => {
            let booked = service.append_appointment(
                &parse_hash(&hash)?,
                Appointment {
                    doctor,
                    specialty,
                    date,
                    next_step,
                },
            )?;
            print_json(&AppointmentDto::from(booked))?;
        }
        Commands::Summarize { urls, patient } => {
            let summary = match patient {
                Some(hash) => service.summarise_record(&parse_hash(&hash)?).await?,
                None => service.request_summary(&urls).await?,
            };
            print_json(&SummaryRes { summary })?;
        }
    }

    Ok(())
}
