//! Cover-letter archiving.
//!
//! A composed application is rendered into the cover-letter template and
//! uploaded through a `DocumentArchive`. The upload is recorded as a
//! `CoverLetterDoc` and the job offer is flagged as stored.

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{CoverLetterDoc, JobOfferAnalysis, JobOfferApplication};
use crate::models::job::{self, JobOffer};
use crate::store::{Collection, DocumentStore, Filter};
use crate::tracking::jobs::JobOfferRepository;

pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Used when no template file is configured.
pub const DEFAULT_TEMPLATE: &str = "{{date}}

Application as {{role_title}} at {{company_name}}

Dear Sir or Madam,

{{cover_body}}

Kind regards
";

/// Everything that goes into one rendered cover letter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverLetter {
    pub url: String,
    pub date: NaiveDate,
    pub company_name: String,
    pub title: String,
    pub cover_body: String,
}

impl CoverLetter {
    pub fn from_analysis(
        analysis: &JobOfferAnalysis,
        application: &JobOfferApplication,
        date: NaiveDate,
    ) -> Self {
        Self {
            url: analysis.url.clone(),
            date,
            company_name: analysis.company_name.clone(),
            title: analysis.title.clone(),
            cover_body: application.cover_body.clone(),
        }
    }

    pub fn document_name(&self) -> String {
        format!("Cover Letter - {}", self.company_name)
    }

    /// Replaces every occurrence of the template placeholders. Placeholder
    /// names are case sensitive.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{{date}}", &self.date.format(DATE_FORMAT).to_string())
            .replace("{{company_name}}", &self.company_name)
            .replace("{{role_title}}", &self.title)
            .replace("{{cover_body}}", &self.cover_body)
    }
}

/// Where rendered cover letters are kept. Returns the id of the stored document.
#[async_trait]
pub trait DocumentArchive: Send + Sync {
    async fn upload(&self, name: &str, content: String) -> Result<String, AppError>;
}

/// Archive backed by an S3 (or MinIO) bucket.
pub struct S3Archive {
    client: S3Client,
    bucket: String,
}

impl S3Archive {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl DocumentArchive for S3Archive {
    async fn upload(&self, name: &str, content: String) -> Result<String, AppError> {
        let key = format!("cover-letters/{}.txt", Uuid::new_v4());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(content.into_bytes()))
            .content_type("text/plain; charset=utf-8")
            .send()
            .await
            .map_err(|e| AppError::S3(format!("Upload of '{name}' failed: {e}")))?;

        info!("Uploaded cover letter to s3://{}/{}", self.bucket, key);
        Ok(key)
    }
}

#[derive(Clone)]
pub struct StorageService {
    jobs: JobOfferRepository,
    docs: Collection<CoverLetterDoc>,
    archive: Arc<dyn DocumentArchive>,
    template: Arc<str>,
}

impl StorageService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        archive: Arc<dyn DocumentArchive>,
        template: Arc<str>,
    ) -> Self {
        Self {
            jobs: JobOfferRepository::new(Arc::clone(&store)),
            docs: Collection::new(store),
            archive,
            template,
        }
    }

    /// Renders, uploads and records the cover letter, then marks its job
    /// offer as stored. A job offer deleted in the meantime is not an error.
    pub async fn store_cover_letter(
        &self,
        letter: &CoverLetter,
    ) -> Result<CoverLetterDoc, AppError> {
        let name = letter.document_name();
        let document_id = self
            .archive
            .upload(&name, letter.render(&self.template))
            .await?;

        let doc = CoverLetterDoc {
            url: letter.url.clone(),
            document_id,
            name,
            added: Utc::now(),
        };
        self.docs.add(&doc).await?;
        self.jobs.mark_stored(&letter.url).await?;

        info!("Stored '{}' for {}", doc.name, doc.url);
        Ok(doc)
    }

    pub async fn load_cover_letter_docs(
        &self,
        job: &JobOffer,
    ) -> Result<Vec<CoverLetterDoc>, AppError> {
        let docs = self
            .docs
            .filter(&Filter::eq(job::URL, job.url.as_str()))
            .await?
            .try_collect()?;
        Ok(docs)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Mutex;

    /// Keeps uploads in memory, or fails every upload when `failing` is set.
    #[derive(Default)]
    pub(crate) struct MemoryArchive {
        pub uploads: Mutex<Vec<(String, String)>>,
        pub failing: bool,
    }

    #[async_trait]
    impl DocumentArchive for MemoryArchive {
        async fn upload(&self, name: &str, content: String) -> Result<String, AppError> {
            if self.failing {
                return Err(AppError::S3("bucket unavailable".to_string()));
            }
            let mut uploads = self
                .uploads
                .lock()
                .map_err(|_| AppError::S3("poisoned".to_string()))?;
            uploads.push((name.to_string(), content));
            Ok(format!("doc-{}", uploads.len()))
        }
    }

    fn letter() -> CoverLetter {
        CoverLetter {
            url: "https://acme.test/jobs/1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            company_name: "Acme".to_string(),
            title: "Rust Engineer".to_string(),
            cover_body: "I build reliable services.".to_string(),
        }
    }

    #[test]
    fn test_render_replaces_every_placeholder() {
        let template =
            "{{date}} | {{company_name}} | {{role_title}} | {{cover_body}} | {{company_name}}";
        let rendered = letter().render(template);
        assert_eq!(
            rendered,
            "05.03.2024 | Acme | Rust Engineer | I build reliable services. | Acme"
        );
    }

    #[test]
    fn test_render_is_case_sensitive() {
        assert_eq!(letter().render("{{Company_Name}}"), "{{Company_Name}}");
    }

    #[test]
    fn test_document_name() {
        assert_eq!(letter().document_name(), "Cover Letter - Acme");
    }

    #[test]
    fn test_from_analysis_takes_company_and_body() {
        let analysis = JobOfferAnalysis {
            url: "https://acme.test/jobs/1".to_string(),
            company_name: "Acme".to_string(),
            title: "Rust Engineer".to_string(),
            summary: String::new(),
            requirements: vec![],
            tasks: vec![],
            added: Utc::now(),
        };
        let application = JobOfferApplication {
            url: analysis.url.clone(),
            cover_body: "I build reliable services.".to_string(),
            prompt: None,
            added: Utc::now(),
        };
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(CoverLetter::from_analysis(&analysis, &application, date), letter());
    }

    #[tokio::test]
    async fn test_store_records_doc_and_marks_job() {
        let store = Arc::new(MemoryStore::new());
        let jobs = JobOfferRepository::new(store.clone());
        jobs.add_job(&JobOffer::new(letter().url, "https://acme.test", "Rust Engineer"))
            .await
            .unwrap();
        let archive = Arc::new(MemoryArchive::default());
        let service = StorageService::new(store, archive.clone(), Arc::from(DEFAULT_TEMPLATE));

        let doc = service.store_cover_letter(&letter()).await.unwrap();
        assert_eq!(doc.document_id, "doc-1");
        assert_eq!(doc.name, "Cover Letter - Acme");

        let uploads = archive.uploads.lock().unwrap().clone();
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].1.starts_with("05.03.2024"));
        assert!(uploads[0].1.contains("I build reliable services."));

        let job = jobs.job_for_url(&letter().url).await.unwrap();
        assert!(job.state.stored);
        assert_eq!(service.load_cover_letter_docs(&job).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_without_job_still_records_doc() {
        let store = Arc::new(MemoryStore::new());
        let service = StorageService::new(
            store,
            Arc::new(MemoryArchive::default()),
            Arc::from(DEFAULT_TEMPLATE),
        );
        service.store_cover_letter(&letter()).await.unwrap();
        let job = JobOffer::new(letter().url, "https://acme.test", "Rust Engineer");
        assert_eq!(service.load_cover_letter_docs(&job).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_upload_records_nothing() {
        let store = Arc::new(MemoryStore::new());
        let archive = Arc::new(MemoryArchive {
            failing: true,
            ..Default::default()
        });
        let service = StorageService::new(store, archive, Arc::from(DEFAULT_TEMPLATE));

        let err = service.store_cover_letter(&letter()).await.unwrap_err();
        assert!(matches!(err, AppError::S3(_)));
        let job = JobOffer::new(letter().url, "https://acme.test", "Rust Engineer");
        assert!(service.load_cover_letter_docs(&job).await.unwrap().is_empty());
    }
}
