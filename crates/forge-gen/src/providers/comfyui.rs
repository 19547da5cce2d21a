//! ComfyUI local-server provider
//!
//! Asynchronous workflow submission: each request opens one WebSocket to
//! the server, POSTs a declarative node graph to `/prompt`, waits for the
//! `executed` event for that prompt id, then fetches the rendered output
//! over HTTP GET `/view`. The connection is torn down on completion or
//! error; there is no pooling or reuse.

use crate::config::StudioConfig;
use crate::prompt::build_prompt;
use crate::provider::{GenerationProvider, ProviderStatus};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use forge_core::{ForgeError, GenerationOptions, Result};
use log::debug;
use std::time::Duration;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::Message;

const DEFAULT_ADDRESS: &str = "http://127.0.0.1:8188";
const CHECKPOINT: &str = "sd_xl_base_1.0.safetensors";
const NEGATIVE_PROMPT: &str = "text, watermark, blurry, low quality, jpeg artifacts, ugly";
const INPAINT_NEGATIVE_PROMPT: &str =
    "text, watermark, blurry, low quality, jpeg artifacts, ugly, deformed";
const REQUEST_TIMEOUT_SECS: u64 = 60;
const WS_READ_TIMEOUT_SECS: u64 = 600;

/// An output image reference reported by an `executed` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputImage {
    pub filename: String,
    pub subfolder: String,
    pub image_type: String,
}

/// ComfyUI provider for local workflow-based generation
pub struct ComfyUiProvider {
    address: String,
    client_id: String,
}

impl ComfyUiProvider {
    /// Create a provider from settings. The server address acts as the
    /// credential here; an explicitly empty address fails fast.
    pub fn from_config(config: &StudioConfig) -> Result<Self> {
        let address = match config.providers.get("comfyui") {
            Some(p) if p.address.as_deref() == Some("") => {
                return Err(ForgeError::MissingCredential {
                    provider: "ComfyUI".to_string(),
                })
            }
            _ => config.address("comfyui").unwrap_or(DEFAULT_ADDRESS),
        };

        Ok(Self {
            address: address.trim_end_matches('/').to_string(),
            client_id: uuid::Uuid::new_v4().to_string(),
        })
    }

    /// Submit a workflow and block until its output is available
    fn run_workflow(&self, workflow: &serde_json::Value) -> Result<String> {
        let ws_url = ws_url(&self.address, &self.client_id)?;
        let (mut socket, _response) = tungstenite::connect(ws_url.as_str()).map_err(|e| {
            debug!("websocket connect to {} failed: {}", ws_url, e);
            self.connect_error()
        })?;
        if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
            let _ = stream.set_read_timeout(Some(Duration::from_secs(WS_READ_TIMEOUT_SECS)));
        }

        let queue_result = self.queue_prompt(workflow);
        let prompt_id = match queue_result {
            Ok(id) => id,
            Err(e) => {
                socket.close(None).ok();
                return Err(e);
            }
        };
        debug!("queued ComfyUI prompt {}", prompt_id);

        loop {
            let msg = socket.read().map_err(|e| {
                ForgeError::ServiceError(format!("ComfyUI connection lost: {}", e))
            })?;
            match msg {
                Message::Text(text) => {
                    let event: serde_json::Value = match serde_json::from_str(&text) {
                        Ok(event) => event,
                        Err(_) => continue,
                    };
                    if let Some(message) = parse_execution_error(&event) {
                        socket.close(None).ok();
                        return Err(ForgeError::ServiceError(format!(
                            "ComfyUI execution error: {}",
                            message
                        )));
                    }
                    if let Some(output) = parse_executed_event(&event, &prompt_id) {
                        let bytes = self.fetch_view(&output);
                        socket.close(None).ok();
                        return Ok(BASE64.encode(bytes?));
                    }
                }
                Message::Close(_) => {
                    return Err(ForgeError::ServiceError(
                        "ComfyUI closed the connection before the workflow completed".to_string(),
                    ));
                }
                // Binary frames carry live previews; not needed here
                _ => {}
            }
        }
    }

    /// POST the node graph to `/prompt`, returning the server's prompt id
    fn queue_prompt(&self, workflow: &serde_json::Value) -> Result<String> {
        let payload = serde_json::json!({
            "prompt": workflow,
            "client_id": self.client_id,
        });
        let agent = build_agent();
        let response = agent
            .post(&format!("{}/prompt", self.address))
            .header("Content-Type", "application/json")
            .send_json(&payload);

        match response {
            Ok(mut ok) => {
                let body: serde_json::Value = ok.body_mut().read_json().map_err(|e| {
                    ForgeError::ServiceError(format!("Failed to parse queue response: {}", e))
                })?;
                parse_queue_response(&body)
            }
            Err(ureq::Error::StatusCode(code)) => Err(ForgeError::ServiceError(format!(
                "Failed to queue prompt in ComfyUI (HTTP {})",
                code
            ))),
            Err(_) => Err(self.connect_error()),
        }
    }

    /// Fetch a rendered output via `/view`
    fn fetch_view(&self, output: &OutputImage) -> Result<Vec<u8>> {
        let url = format!(
            "{}/view?filename={}&subfolder={}&type={}",
            self.address,
            encode_query(&output.filename),
            encode_query(&output.subfolder),
            encode_query(&output.image_type),
        );
        let agent = build_agent();
        let response = agent.get(&url).call().map_err(|e| {
            ForgeError::ServiceError(format!("Failed to download ComfyUI output: {}", e))
        })?;
        let mut reader = response.into_body().into_reader();
        let mut bytes = Vec::new();
        std::io::Read::read_to_end(&mut reader, &mut bytes)
            .map_err(|e| ForgeError::ServiceError(format!("Failed to read output image: {}", e)))?;
        Ok(bytes)
    }

    /// Upload a PNG payload via multipart POST `/upload/image`, returning
    /// the server-side filename
    fn upload_image(&self, image_b64: &str, filename: &str) -> Result<String> {
        let bytes = BASE64
            .decode(image_b64)
            .map_err(|e| ForgeError::ImageError(format!("Invalid base64 image data: {}", e)))?;
        let (boundary, body) = multipart_png(filename, &bytes);

        let agent = build_agent();
        let response = agent
            .post(&format!("{}/upload/image", self.address))
            .header(
                "Content-Type",
                &format!("multipart/form-data; boundary={}", boundary),
            )
            .send(&body[..]);

        match response {
            Ok(mut ok) => {
                let body: serde_json::Value = ok.body_mut().read_json().map_err(|e| {
                    ForgeError::ServiceError(format!("Failed to parse upload response: {}", e))
                })?;
                parse_upload_response(&body)
            }
            Err(ureq::Error::StatusCode(code)) => Err(ForgeError::ServiceError(format!(
                "Failed to upload image to ComfyUI (HTTP {})",
                code
            ))),
            Err(_) => Err(self.connect_error()),
        }
    }

    fn connect_error(&self) -> ForgeError {
        ForgeError::ServiceError(format!(
            "Could not connect to ComfyUI server at {}. Make sure it's running and accessible",
            self.address
        ))
    }
}

fn build_agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .build();
    config.into()
}

/// Derive the WebSocket endpoint from the server's HTTP address
pub fn ws_url(address: &str, client_id: &str) -> Result<String> {
    let base = if let Some(rest) = address.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if let Some(rest) = address.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else {
        return Err(ForgeError::ConfigError(format!(
            "ComfyUI address must start with http:// or https://, got '{}'",
            address
        )));
    };
    Ok(format!(
        "{}/ws?clientId={}",
        base.trim_end_matches('/'),
        client_id
    ))
}

/// Minimal query-component encoding for server-generated filenames
fn encode_query(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn multipart_png(filename: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    let boundary = format!("forge-{}", uuid::Uuid::new_v4().simple());
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"overwrite\"\r\n\r\ntrue\r\n");
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    (boundary, body)
}

fn random_seed() -> u64 {
    // One seed per submission; reproducible runs pass an explicit seed
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    let millis = forge_core::time::now_millis() as u64;
    (millis.wrapping_mul(1_000_000).wrapping_add(nanos)) % 1_000_000_000_000_000
}

/// Standard SDXL text-to-image node graph
pub fn build_text_workflow(prompt: &str, seed: u64) -> serde_json::Value {
    serde_json::json!({
        "3": {
            "inputs": {
                "seed": seed, "steps": 25, "cfg": 8,
                "sampler_name": "dpmpp_2m", "scheduler": "karras", "denoise": 1,
                "model": ["4", 0], "positive": ["6", 0], "negative": ["7", 0],
                "latent_image": ["5", 0]
            },
            "class_type": "KSampler"
        },
        "4": { "inputs": { "ckpt_name": CHECKPOINT }, "class_type": "CheckpointLoaderSimple" },
        "5": { "inputs": { "width": 1024, "height": 1024, "batch_size": 1 }, "class_type": "EmptyLatentImage" },
        "6": { "inputs": { "text": prompt, "clip": ["4", 1] }, "class_type": "CLIPTextEncode" },
        "7": { "inputs": { "text": NEGATIVE_PROMPT, "clip": ["4", 1] }, "class_type": "CLIPTextEncode" },
        "8": { "inputs": { "samples": ["3", 0], "vae": ["4", 2] }, "class_type": "VAEDecode" },
        "9": { "inputs": { "filename_prefix": "Forge", "images": ["8", 0] }, "class_type": "SaveImage" }
    })
}

/// Inpainting node graph over two uploaded images. The mask's alpha
/// channel selects the region to regenerate (opaque = regenerate).
pub fn build_inpaint_workflow(
    base_name: &str,
    mask_name: &str,
    prompt: &str,
    seed: u64,
) -> serde_json::Value {
    serde_json::json!({
        "1": { "inputs": { "pixels": ["18", 0], "vae": ["13", 2] }, "class_type": "VAEEncode" },
        "2": {
            "inputs": {
                "seed": seed, "steps": 25, "cfg": 8,
                "sampler_name": "dpmpp_2m_sde", "scheduler": "karras", "denoise": 1,
                "model": ["13", 0], "positive": ["14", 0], "negative": ["15", 0],
                "latent_image": ["16", 0]
            },
            "class_type": "KSampler"
        },
        "5": { "inputs": { "samples": ["2", 0], "vae": ["13", 2] }, "class_type": "VAEDecode" },
        "9": { "inputs": { "filename_prefix": "Forge_Inpaint", "images": ["5", 0] }, "class_type": "SaveImage" },
        "13": { "inputs": { "ckpt_name": CHECKPOINT }, "class_type": "CheckpointLoaderSimple" },
        "14": { "inputs": { "text": prompt, "clip": ["13", 1] }, "class_type": "CLIPTextEncode" },
        "15": { "inputs": { "text": INPAINT_NEGATIVE_PROMPT, "clip": ["13", 1] }, "class_type": "CLIPTextEncode" },
        "16": { "inputs": { "pixels": ["1", 0], "mask": ["17", 0] }, "class_type": "SetLatentNoiseMask" },
        "17": { "inputs": { "image": mask_name, "channel": "alpha" }, "class_type": "LoadImage" },
        "18": { "inputs": { "image": base_name }, "class_type": "LoadImage" }
    })
}

/// Extract the prompt id from a `/prompt` response
pub fn parse_queue_response(body: &serde_json::Value) -> Result<String> {
    body.get("prompt_id")
        .and_then(|id| id.as_str())
        .map(|id| id.to_string())
        .ok_or_else(|| {
            ForgeError::ServiceError(format!(
                "Unexpected queue response: {}",
                serde_json::to_string(body).unwrap_or_default()
            ))
        })
}

/// Extract the server-side filename from an `/upload/image` response
pub fn parse_upload_response(body: &serde_json::Value) -> Result<String> {
    body.get("name")
        .and_then(|n| n.as_str())
        .map(|n| n.to_string())
        .ok_or_else(|| {
            ForgeError::ServiceError(format!(
                "Unexpected upload response: {}",
                serde_json::to_string(body).unwrap_or_default()
            ))
        })
}

/// Match an `executed` event for our prompt and pull out its first image
pub fn parse_executed_event(event: &serde_json::Value, prompt_id: &str) -> Option<OutputImage> {
    if event.get("type").and_then(|t| t.as_str()) != Some("executed") {
        return None;
    }
    let data = event.get("data")?;
    // Events for other prompts queued by the same server are ignored
    if let Some(id) = data.get("prompt_id").and_then(|id| id.as_str()) {
        if id != prompt_id {
            return None;
        }
    }
    let image = data.get("output")?.get("images")?.as_array()?.first()?;
    Some(OutputImage {
        filename: image.get("filename")?.as_str()?.to_string(),
        subfolder: image
            .get("subfolder")
            .and_then(|s| s.as_str())
            .unwrap_or("")
            .to_string(),
        image_type: image
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or("output")
            .to_string(),
    })
}

/// Pull the failure message out of an `execution_error` event
pub fn parse_execution_error(event: &serde_json::Value) -> Option<String> {
    if event.get("type").and_then(|t| t.as_str()) != Some("execution_error") {
        return None;
    }
    Some(
        event
            .get("data")
            .and_then(|d| d.get("exception_message"))
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error")
            .to_string(),
    )
}

impl GenerationProvider for ComfyUiProvider {
    fn name(&self) -> &str {
        "comfyui"
    }

    fn health_check(&self) -> Result<ProviderStatus> {
        let agent = build_agent();
        match agent
            .get(&format!("{}/system_stats", self.address))
            .call()
        {
            Ok(_) => Ok(ProviderStatus::Available),
            Err(e) => Ok(ProviderStatus::Unavailable(format!(
                "server at {} unreachable: {}",
                self.address, e
            ))),
        }
    }

    fn generate(&self, options: &GenerationOptions) -> Result<String> {
        let full_prompt = build_prompt(options);
        let seed = options.seed.unwrap_or_else(random_seed);
        let workflow = build_text_workflow(&full_prompt, seed);
        self.run_workflow(&workflow)
    }

    fn inpaint(&self, image_b64: &str, mask_b64: &str, prompt: &str) -> Result<String> {
        let base_name = self.upload_image(image_b64, "forge_inpaint_base.png")?;
        let mask_name = self.upload_image(mask_b64, "forge_inpaint_mask.png")?;

        let inpaint_prompt = format!("{}, high quality, detailed", prompt);
        let workflow =
            build_inpaint_workflow(&base_name, &mask_name, &inpaint_prompt, random_seed());
        self.run_workflow(&workflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_url_from_http() {
        let url = ws_url("http://127.0.0.1:8188", "client-1").unwrap();
        assert_eq!(url, "ws://127.0.0.1:8188/ws?clientId=client-1");
    }

    #[test]
    fn test_ws_url_from_https() {
        let url = ws_url("https://comfy.example.com", "abc").unwrap();
        assert_eq!(url, "wss://comfy.example.com/ws?clientId=abc");
    }

    #[test]
    fn test_ws_url_rejects_bare_host() {
        assert!(ws_url("127.0.0.1:8188", "c").is_err());
    }

    #[test]
    fn test_text_workflow_wires_prompt() {
        let workflow = build_text_workflow("isometric, game asset, barrel", 42);
        assert_eq!(
            workflow["6"]["inputs"]["text"].as_str().unwrap(),
            "isometric, game asset, barrel"
        );
        assert_eq!(workflow["3"]["inputs"]["seed"].as_u64().unwrap(), 42);
        assert_eq!(workflow["9"]["class_type"].as_str().unwrap(), "SaveImage");
    }

    #[test]
    fn test_inpaint_workflow_uses_mask_alpha() {
        let workflow = build_inpaint_workflow("base.png", "mask.png", "red roof", 7);
        assert_eq!(workflow["17"]["inputs"]["image"].as_str().unwrap(), "mask.png");
        assert_eq!(workflow["17"]["inputs"]["channel"].as_str().unwrap(), "alpha");
        assert_eq!(workflow["18"]["inputs"]["image"].as_str().unwrap(), "base.png");
        assert_eq!(
            workflow["16"]["class_type"].as_str().unwrap(),
            "SetLatentNoiseMask"
        );
    }

    #[test]
    fn test_parse_queue_response() {
        let body = serde_json::json!({ "prompt_id": "abc-123", "number": 4 });
        assert_eq!(parse_queue_response(&body).unwrap(), "abc-123");
        assert!(parse_queue_response(&serde_json::json!({})).is_err());
    }

    #[test]
    fn test_parse_executed_event_matches_prompt() {
        let event = serde_json::json!({
            "type": "executed",
            "data": {
                "prompt_id": "p1",
                "output": { "images": [
                    { "filename": "Forge_00001_.png", "subfolder": "", "type": "output" }
                ]}
            }
        });
        let output = parse_executed_event(&event, "p1").unwrap();
        assert_eq!(output.filename, "Forge_00001_.png");
        assert_eq!(output.image_type, "output");

        // Someone else's prompt
        assert!(parse_executed_event(&event, "p2").is_none());
    }

    #[test]
    fn test_parse_executed_ignores_other_events() {
        let event = serde_json::json!({ "type": "progress", "data": { "value": 3 } });
        assert!(parse_executed_event(&event, "p1").is_none());
    }

    #[test]
    fn test_parse_execution_error() {
        let event = serde_json::json!({
            "type": "execution_error",
            "data": { "exception_message": "CUDA out of memory" }
        });
        assert_eq!(
            parse_execution_error(&event).unwrap(),
            "CUDA out of memory"
        );
        assert!(parse_execution_error(&serde_json::json!({ "type": "executed" })).is_none());
    }

    #[test]
    fn test_empty_address_fails_fast() {
        let mut config = StudioConfig::default();
        config.set_address("comfyui", "");
        let err = ComfyUiProvider::from_config(&config).err().unwrap();
        assert!(matches!(err, ForgeError::MissingCredential { .. }));
    }

    #[test]
    fn test_default_address_applies() {
        let config = StudioConfig::default();
        let provider = ComfyUiProvider::from_config(&config).unwrap();
        assert_eq!(provider.address, DEFAULT_ADDRESS);
    }

    #[test]
    fn test_multipart_body_contains_fields() {
        let (boundary, body) = multipart_png("mask.png", b"\x89PNG");
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains(&format!("--{}", boundary)));
        assert!(text.contains("filename=\"mask.png\""));
        assert!(text.contains("name=\"overwrite\""));
    }

    #[test]
    fn test_encode_query() {
        assert_eq!(encode_query("Forge_00001_.png"), "Forge_00001_.png");
        assert_eq!(encode_query("a b&c"), "a%20b%26c");
    }
}
