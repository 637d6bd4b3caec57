//! Integration tests for the promptsmith library.
//! These tests require an API key in the environment to run.

#[cfg(test)]
mod tests {
    use promptsmith::{CompletionClient, CompletionRequest, Gemini, GenerateContentRequest};

    #[tokio::test]
    async fn test_simple_completion() {
        // This test requires GOOGLE_API_KEY to be set
        let api_key = std::env::var("GOOGLE_API_KEY").ok();
        if api_key.is_none() {
            eprintln!("Skipping test: GOOGLE_API_KEY not set");
            return;
        }

        let client = Gemini::new(api_key).expect("Failed to create client");
        let reply = client
            .complete(&CompletionRequest::new("Say 'test passed'"))
            .await;
        assert!(reply.is_ok(), "Request should succeed with valid API key");
    }

    #[tokio::test]
    async fn test_invalid_key_is_reported() {
        if std::env::var("GOOGLE_API_KEY").is_err() {
            eprintln!("Skipping test: GOOGLE_API_KEY not set");
            return;
        }

        let client = Gemini::new(Some("not-a-real-key".to_string())).unwrap();
        let client_model = client.model().clone();
        let err = client
            .generate_content(&client_model, &GenerateContentRequest::new("hi", None))
            .await
            .unwrap_err();
        assert!(err.is_completion());
    }
}
