//! Plain-text email bodies for inquiry traffic.

pub struct InquiryNotification<'a> {
    pub id: &'a str,
    pub category: &'a str,
    pub subject: &'a str,
    pub message: &'a str,
    pub contact_name: &'a str,
    pub contact_email: &'a str,
}

pub fn inquiry_notification(data: &InquiryNotification<'_>) -> (String, String) {
    let subject = format!("[Portfolio] New Inquiry: {}", data.subject);
    let body = format!(
        "New inquiry received\n\n\
         ID: {}\n\
         Category: {}\n\
         Subject: {}\n\
         Name: {}\n\
         Email: {}\n\n\
         Message:\n{}\n",
        data.id, data.category, data.subject, data.contact_name, data.contact_email, data.message
    );
    (subject, body)
}

pub fn inquiry_auto_reply(inquiry_subject: &str) -> (String, String) {
    let subject = "[Portfolio] お問い合わせを受け付けました".to_string();
    let body = format!(
        "お問い合わせありがとうございます。\n\n\
         件名: {}\n\n\
         内容を確認し、追ってご連絡いたします。\n",
        inquiry_subject
    );
    (subject, body)
}

pub fn inquiry_reply(message: &str) -> (String, String) {
    let subject = "[Portfolio] お問い合わせへの返信".to_string();
    let body = format!("お問い合わせへの返信です。\n\n{}\n", message);
    (subject, body)
}
