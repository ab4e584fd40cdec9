use aws_sdk_ses as ses;
use aws_sdk_ses::types::{Body, Content, Destination, Message};
use lambda_runtime::tracing;

use crate::error::{ServiceError, ServiceResult};

const CHARSET: &str = "UTF-8";

const DEFAULT_REPORT_CONTENT: &str = "<h2>Daily Summary</h2>\
<p>All systems operational. No incidents were recorded in the last 24 hours.</p>";

/// An outgoing email. `html` is always sent; `text` is the plain-text alternative.
#[derive(Debug, Clone, Default)]
pub struct Email {
    to: Vec<String>,
    subject: String,
    html: String,
    text: Option<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    reply_to: Vec<String>,
}

impl Email {
    pub fn new(to: Vec<String>, subject: impl Into<String>, html: impl Into<String>) -> Email {
        Email {
            to,
            subject: subject.into(),
            html: html.into(),
            ..Default::default()
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Email {
        self.text = Some(text.into());
        self
    }

    pub fn cc(mut self, cc: Vec<String>) -> Email {
        self.cc = cc;
        self
    }

    pub fn bcc(mut self, bcc: Vec<String>) -> Email {
        self.bcc = bcc;
        self
    }

    pub fn reply_to(mut self, reply_to: Vec<String>) -> Email {
        self.reply_to = reply_to;
        self
    }

    fn message(&self) -> ServiceResult<Message> {
        let subject = Content::builder().data(&self.subject).charset(CHARSET).build()?;
        let html = Content::builder().data(&self.html).charset(CHARSET).build()?;
        let text = self
            .text
            .as_ref()
            .map(|text| Content::builder().data(text).charset(CHARSET).build())
            .transpose()?;

        Ok(Message::builder()
            .subject(subject)
            .body(Body::builder().html(html).set_text(text).build())
            .build())
    }

    fn destination(&self) -> Destination {
        Destination::builder()
            .set_to_addresses(Some(self.to.clone()))
            .set_cc_addresses(non_empty(&self.cc))
            .set_bcc_addresses(non_empty(&self.bcc))
            .build()
    }
}

fn non_empty(addresses: &[String]) -> Option<Vec<String>> {
    (!addresses.is_empty()).then(|| addresses.to_vec())
}

pub fn render_template(title: &str, body_content: &str, environment: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>{title}</title>
<style>
  body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333333; margin: 0; padding: 0; }}
  .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
  .header {{ background-color: #232f3e; color: #ffffff; padding: 20px; text-align: center; }}
  .content {{ background-color: #f9f9f9; padding: 20px; }}
  .footer {{ font-size: 12px; color: #777777; text-align: center; padding: 10px; }}
</style>
</head>
<body>
<div class="container">
  <div class="header"><h1>{title}</h1></div>
  <div class="content">{body_content}</div>
  <div class="footer">Sent from the {environment} environment</div>
</div>
</body>
</html>"#
    )
}

/// Mail adapter bound to a single sender address.
#[derive(Debug)]
pub struct MailService {
    from: String,
    environment: String,
    client: ses::Client,
}

impl MailService {
    pub fn new(
        client: ses::Client,
        from: impl Into<String>,
        environment: impl Into<String>,
    ) -> MailService {
        MailService {
            from: from.into(),
            environment: environment.into(),
            client,
        }
    }

    pub fn from_address(&self) -> &str {
        &self.from
    }

    pub async fn send(&self, email: Email) -> ServiceResult<String> {
        let out = self
            .client
            .send_email()
            .source(&self.from)
            .destination(email.destination())
            .message(email.message()?)
            .set_reply_to_addresses(non_empty(&email.reply_to))
            .send()
            .await
            .map_err(|e| e.into_service_error())
            .map_err(|err| {
                tracing::error!("Failed to send email from {}: {}", self.from, err);
                ServiceError::remote(&err)
            })?;

        let message_id = out.message_id().to_string();
        tracing::info!(
            "Sent email {} from {} to {} recipients",
            message_id,
            self.from,
            email.to.len()
        );
        Ok(message_id)
    }

    pub async fn send_templated(
        &self,
        to: Vec<String>,
        subject: &str,
        title: &str,
        body_content: &str,
        reply_to: Option<Vec<String>>,
    ) -> ServiceResult<String> {
        let html = render_template(title, body_content, &self.environment);
        let email = Email::new(to, subject, html).reply_to(reply_to.unwrap_or_default());
        self.send(email).await
    }

    pub async fn send_daily_report(
        &self,
        to: Vec<String>,
        content: Option<&str>,
    ) -> ServiceResult<String> {
        let today = chrono::Utc::now().format("%Y-%m-%d");
        let subject = format!("Daily Report - {today}");
        let title = format!("Daily Report for {today}");
        self.send_templated(
            to,
            &subject,
            &title,
            content.unwrap_or(DEFAULT_REPORT_CONTENT),
            None,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ses::operation::send_email::{SendEmailError, SendEmailOutput};
    use aws_sdk_ses::types::error::MessageRejected;
    use aws_smithy_mocks::{mock, mock_client};

    const SENDER: &str = "sender@example.com";

    fn html_of(req: &aws_sdk_ses::operation::send_email::SendEmailInput) -> String {
        req.message()
            .and_then(|m| m.body())
            .and_then(|b| b.html())
            .map(|c| c.data().to_string())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_should_send_email_with_all_recipients() {
        let send = mock!(aws_sdk_ses::Client::send_email)
            .match_requests(|req| {
                let destination = req.destination().unwrap();
                req.source() == Some(SENDER)
                    && destination.to_addresses() == ["to@example.com"]
                    && destination.cc_addresses() == ["cc@example.com"]
                    && destination.bcc_addresses() == ["bcc@example.com"]
                    && req.reply_to_addresses() == ["reply@example.com"]
                    && req
                        .message()
                        .and_then(|m| m.body())
                        .and_then(|b| b.text())
                        .is_some()
            })
            .then_output(|| {
                SendEmailOutput::builder()
                    .message_id("msg-1")
                    .build()
                    .unwrap()
            });
        let mail = MailService::new(mock_client!(aws_sdk_ses, [&send]), SENDER, "test");

        let email = Email::new(
            vec!["to@example.com".to_string()],
            "Test with metadata",
            "<html><body>Test</body></html>",
        )
        .text("Test")
        .cc(vec!["cc@example.com".to_string()])
        .bcc(vec!["bcc@example.com".to_string()])
        .reply_to(vec!["reply@example.com".to_string()]);
        let message_id = mail.send(email).await.unwrap();

        assert_eq!(message_id, "msg-1");
        assert_eq!(send.num_calls(), 1);
    }

    #[tokio::test]
    async fn test_should_send_html_only_email() {
        let send = mock!(aws_sdk_ses::Client::send_email)
            .match_requests(|req| {
                req.message()
                    .and_then(|m| m.body())
                    .is_some_and(|b| b.html().is_some() && b.text().is_none())
            })
            .then_output(|| {
                SendEmailOutput::builder()
                    .message_id("msg-2")
                    .build()
                    .unwrap()
            });
        let mail = MailService::new(mock_client!(aws_sdk_ses, [&send]), SENDER, "test");

        let email = Email::new(vec!["r@example.com".to_string()], "HTML Only", "<h1>Hi</h1>");

        assert_eq!(mail.send(email).await.unwrap(), "msg-2");
    }

    #[tokio::test]
    async fn test_should_render_templated_email() {
        let send = mock!(aws_sdk_ses::Client::send_email)
            .match_requests(|req| {
                let html = html_of(req);
                html.contains("<style>")
                    && html.contains("<h1>Welcome</h1>")
                    && html.contains("<p>Hello!</p>")
                    && html.contains("staging environment")
            })
            .then_output(|| {
                SendEmailOutput::builder()
                    .message_id("msg-3")
                    .build()
                    .unwrap()
            });
        let mail = MailService::new(mock_client!(aws_sdk_ses, [&send]), SENDER, "staging");

        let message_id = mail
            .send_templated(
                vec!["user@example.com".to_string()],
                "Templated Email",
                "Welcome",
                "<p>Hello!</p>",
                None,
            )
            .await
            .unwrap();

        assert_eq!(message_id, "msg-3");
    }

    #[tokio::test]
    async fn test_should_use_default_report_content() {
        let send = mock!(aws_sdk_ses::Client::send_email)
            .match_requests(|req| {
                let subject = req
                    .message()
                    .and_then(|m| m.subject())
                    .map(|s| s.data().to_string())
                    .unwrap_or_default();
                subject.starts_with("Daily Report - ") && html_of(req).contains("Daily Summary")
            })
            .then_output(|| {
                SendEmailOutput::builder()
                    .message_id("msg-4")
                    .build()
                    .unwrap()
            });
        let mail = MailService::new(mock_client!(aws_sdk_ses, [&send]), SENDER, "dev");

        let message_id = mail
            .send_daily_report(vec!["admin@example.com".to_string()], None)
            .await
            .unwrap();

        assert_eq!(message_id, "msg-4");
    }

    #[tokio::test]
    async fn test_should_surface_rejection_as_remote_error() {
        let send = mock!(aws_sdk_ses::Client::send_email).then_error(|| {
            SendEmailError::MessageRejected(
                MessageRejected::builder()
                    .message("Email address is not verified.")
                    .build(),
            )
        });
        let mail = MailService::new(mock_client!(aws_sdk_ses, [&send]), SENDER, "dev");

        let email = Email::new(vec!["x@example.com".to_string()], "s", "<p>b</p>");
        let err = mail.send(email).await.unwrap_err();

        match err {
            ServiceError::Remote { message, .. } => {
                assert!(message.contains("Email address is not verified."))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_should_embed_environment_in_template() {
        let html = render_template("Title", "<p>Body</p>", "prod");
        assert!(html.contains("<title>Title</title>"));
        assert!(html.contains("<div class=\"content\"><p>Body</p></div>"));
        assert!(html.contains("Sent from the prod environment"));
    }
}
