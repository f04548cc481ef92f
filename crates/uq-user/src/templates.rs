/// Render the verification email body, including the code and the deep link
/// into the frontend.
pub fn verification_email(to: &str, name: &str, code: &str, frontend_url: &str) -> Vec<u8> {
    let link = format!("{}/verify-email?code={}", frontend_url, code);
    format!(
        "To: {to}\r\n\
         Subject: UserQ: Verify your email address\r\n\
         \r\n\
         Hi {name},\n\n\
         Your verification code is {code}.\n\
         Please follow the link to verify your account: {link}\r\n"
    )
    .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_body_contains_code_and_deep_link() {
        let body = verification_email("ada@example.com", "Ada", "4821", "https://app.example.com");
        let text = String::from_utf8(body).unwrap();

        assert!(text.contains("To: ada@example.com"));
        assert!(text.contains("Hi Ada"));
        assert!(text.contains("4821"));
        assert!(text.contains("https://app.example.com/verify-email?code=4821"));
    }
}
