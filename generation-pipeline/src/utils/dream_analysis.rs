use async_openai::types::{
    ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContentPart,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, ImageDetail, ImageUrlArgs,
    ResponseFormat, ResponseFormatJsonSchema,
};
use common::{
    error::AppError,
    types::{attachment::DreamAttachment, dream_analysis::DreamAnalysis},
};

use super::llm_instructions::{
    dream_memory_message, get_dream_analysis_schema, DREAM_ANALYSIS_SYSTEM_MESSAGE,
};

pub fn prepare_analysis_request(
    model: &str,
    dream_text: &str,
    attachments: &[DreamAttachment],
) -> Result<CreateChatCompletionRequest, AppError> {
    let mut parts: Vec<ChatCompletionRequestUserMessageContentPart> =
        Vec::with_capacity(attachments.len().saturating_add(1));
    parts.push(
        ChatCompletionRequestMessageContentPartTextArgs::default()
            .text(dream_memory_message(dream_text))
            .build()?
            .into(),
    );

    for attachment in attachments {
        parts.push(
            ChatCompletionRequestMessageContentPartImageArgs::default()
                .image_url(
                    ImageUrlArgs::default()
                        .url(attachment.data_url())
                        .detail(ImageDetail::High)
                        .build()?,
                )
                .build()?
                .into(),
        );
    }

    let response_format = ResponseFormat::JsonSchema {
        json_schema: ResponseFormatJsonSchema {
            description: Some("Structured interpretation of a dream".into()),
            name: "dream_analysis".into(),
            schema: Some(get_dream_analysis_schema()),
            strict: Some(true),
        },
    };

    let request = CreateChatCompletionRequestArgs::default()
        .model(model)
        .messages([
            ChatCompletionRequestSystemMessage::from(DREAM_ANALYSIS_SYSTEM_MESSAGE).into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(parts)
                .build()?
                .into(),
        ])
        .response_format(response_format)
        .build()?;

    Ok(request)
}

pub fn parse_analysis(content: &str) -> Result<DreamAnalysis, AppError> {
    let analysis = serde_json::from_str::<DreamAnalysis>(content).map_err(|e| {
        AppError::LLMParsing(format!("Failed to parse LLM response into dream analysis: {e}"))
    })?;

    if analysis.visual_prompt.trim().is_empty() {
        return Err(AppError::LLMParsing(
            "Dream analysis did not include a visual prompt".into(),
        ));
    }

    Ok(analysis)
}

pub async fn analyze_dream(
    client: &async_openai::Client<async_openai::config::OpenAIConfig>,
    model: &str,
    dream_text: &str,
    attachments: &[DreamAttachment],
) -> Result<DreamAnalysis, AppError> {
    let request = prepare_analysis_request(model, dream_text, attachments)?;
    let response = client.chat().create(request).await?;

    let content = response
        .choices
        .first()
        .and_then(|choice| choice.message.content.as_ref())
        .ok_or(AppError::LLMParsing("No analysis generated".into()))?;

    parse_analysis(content)
}
