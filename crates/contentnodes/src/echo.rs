use crate::services::{
    AnalysisRequest, AnalysisResponse, AnalysisService, ImageRequest, ImageResponse, ImageService,
    MusicRequest, MusicResponse, MusicService, OptimizationRequest, OptimizationResponse,
    OptimizationService, PublishRequest, PublishResponse, PublishService, ServiceError,
    TextRequest, TextResponse, TextService,
};
use async_trait::async_trait;
use contentcore::Value;
use std::collections::HashMap;
use tokio::time::{sleep, Duration};

const POSITIVE: &[&str] = &["good", "great", "happy", "love", "bright", "joy", "win", "best"];
const NEGATIVE: &[&str] = &["bad", "sad", "hate", "dark", "fear", "loss", "worst", "angry"];

/// Offline backend that answers every service call deterministically
///
/// Output is derived from the request alone, so identical requests always
/// produce identical responses. Useful for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct EchoBackend {
    latency: Option<Duration>,
}

impl EchoBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a slow backend
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            sleep(latency).await;
        }
    }
}

fn metadata(kind: &str) -> HashMap<String, Value> {
    let mut metadata = HashMap::new();
    metadata.insert("backend".to_string(), Value::from("echo"));
    metadata.insert("kind".to_string(), Value::from(kind));
    metadata
}

/// FNV-1a, hex encoded
fn digest(input: &str) -> String {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in input.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    format!("{:016x}", hash)
}

/// Distinct lowercase words of four or more letters, in order of appearance
fn keywords(text: &str, limit: usize) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        if word.chars().count() < 4 {
            continue;
        }
        let word = word.to_lowercase();
        if !words.contains(&word) {
            words.push(word);
        }
        if words.len() == limit {
            break;
        }
    }
    words
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[async_trait]
impl TextService for EchoBackend {
    async fn generate_text(&self, request: TextRequest) -> Result<TextResponse, ServiceError> {
        self.pause().await;
        let text = truncate_chars(
            &format!("[{}] {}", request.model, request.prompt),
            request.max_length as usize,
        );

        let mut metadata = metadata("text");
        metadata.insert("length".to_string(), Value::from(text.chars().count() as i64));
        metadata.insert("temperature".to_string(), Value::from(request.temperature));
        Ok(TextResponse { text, metadata })
    }
}

#[async_trait]
impl ImageService for EchoBackend {
    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse, ServiceError> {
        self.pause().await;
        if request.width == 0 || request.height == 0 {
            return Err(ServiceError::Rejected {
                service: "image",
                message: format!("invalid dimensions {}x{}", request.width, request.height),
            });
        }

        let mut metadata = metadata("image");
        metadata.insert(
            "steps".to_string(),
            Value::from(request.num_inference_steps as i64),
        );
        Ok(ImageResponse {
            image: format!(
                "echo://image/{}/{}x{}/{}.png",
                request.style,
                request.width,
                request.height,
                digest(&request.prompt)
            ),
            width: request.width,
            height: request.height,
            metadata,
        })
    }
}

#[async_trait]
impl MusicService for EchoBackend {
    async fn generate_music(&self, request: MusicRequest) -> Result<MusicResponse, ServiceError> {
        self.pause().await;
        Ok(MusicResponse {
            audio: format!(
                "echo://music/{}/{}s/{}.wav",
                request.style,
                request.duration,
                digest(&request.description)
            ),
            metadata: metadata("music"),
        })
    }
}

#[async_trait]
impl AnalysisService for EchoBackend {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse, ServiceError> {
        self.pause().await;
        let lowered = request.content.to_lowercase();
        let score = |words: &[&str]| words.iter().filter(|w| lowered.contains(*w)).count();
        let (sentiment, mood) = match score(POSITIVE).cmp(&score(NEGATIVE)) {
            std::cmp::Ordering::Greater => ("positive", "upbeat"),
            std::cmp::Ordering::Less => ("negative", "somber"),
            std::cmp::Ordering::Equal => ("neutral", "calm"),
        };

        let keywords = keywords(&request.content, 5);
        let mut metadata = metadata("analysis");
        metadata.insert("analysis_type".to_string(), Value::from(request.analysis_type));

        Ok(AnalysisResponse {
            theme: keywords.first().cloned().unwrap_or_else(|| "general".to_string()),
            mood: mood.to_string(),
            topics: keywords.iter().take(3).cloned().collect(),
            keywords,
            sentiment: sentiment.to_string(),
            metadata,
        })
    }
}

#[async_trait]
impl OptimizationService for EchoBackend {
    async fn optimize(
        &self,
        request: OptimizationRequest,
    ) -> Result<OptimizationResponse, ServiceError> {
        self.pause().await;
        let content = request.content;

        let title = if content.title.is_empty() {
            truncate_chars(content.text.lines().next().unwrap_or_default(), 60)
        } else {
            content.title.clone()
        };

        let mut tags: Vec<String> = keywords(&content.text, 4)
            .into_iter()
            .map(|k| format!("#{}", k))
            .collect();
        tags.push(format!("#{}", request.platform));

        let mut tips = vec![format!(
            "Tailored for {} ({} optimization)",
            request.platform, request.optimization_level
        )];
        if content.image_url.is_empty() {
            tips.push("Add a cover image".to_string());
        }

        Ok(OptimizationResponse {
            title,
            content: content.text,
            tags,
            tips,
            metadata: metadata("optimization"),
        })
    }
}

#[async_trait]
impl PublishService for EchoBackend {
    async fn publish(&self, request: PublishRequest) -> Result<PublishResponse, ServiceError> {
        self.pause().await;
        if request.content.content.is_empty() && request.content.images.is_empty() {
            return Err(ServiceError::Rejected {
                service: "publish",
                message: "nothing to publish".to_string(),
            });
        }

        let post_id = format!(
            "{}-{}",
            request.platform,
            &digest(&format!("{}{}", request.content.title, request.content.content))[..12]
        );
        let mut metadata = metadata("publish");
        metadata.insert("user_id".to_string(), Value::from(request.user_id as i64));

        Ok(PublishResponse {
            success: true,
            post_url: format!("echo://{}/posts/{}", request.platform, post_id),
            post_id,
            metadata,
        })
    }
}
