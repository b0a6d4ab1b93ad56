//! Inline HTML for the demo pages. No templating engine on purpose; every
//! page is a small `format!` over data the handlers already fetched.

use serde_json::Value;

use shared::domain::{Activity, Field, FieldViewUser};
use shared::error::ApiError;

const TITLE: &str = "<h1>Partner API Demo Site</h1>";

pub fn login_page(login_uri: &str) -> String {
    format!(
        "{TITLE}
        <h2>Welcome to the Climate Partner Demo App.</h2>
        <p>Imagine that this page is your great web application and you want
        to connect it with Climate FieldView. To do this, you need to let your
        users establish a secure connection between your app and FieldView.
        You do this using Log In with FieldView.</p>
        <p style=\"text-align:center\"><a href=\"{login_uri}\">
        <img src=\"/res/fv-login-button.svg\" alt=\"Log In with FieldView\"></a></p>"
    )
}

pub fn user_home(
    user: &FieldViewUser,
    access_token: &str,
    refresh_token: &str,
    fields: &[Field],
) -> String {
    let field_list = render_ul(fields.iter().map(field_link));
    format!(
        "{TITLE}
        <p>User name retrieved from FieldView: {first} {last}</p>
        <p>Access Token: {access_token}</p>
        <p>Refresh Token: {refresh_token} (<a href=\"/refresh-token\">Refresh</a>)</p>
        <table style=\"border-spacing: 50px 0;\"><tr><td>
        <p>Your Climate fields:{field_list}</p>
        <p><a href=\"/upload\">Upload data</a></p>
        <p><a href=\"/scouting-observations\">Scouting Observations</a></p>
        </td><td>
        <p>Your fields activities:</p>
        <p><a href=\"/layers/asPlanted\">asPlanted</a></p>
        <p><a href=\"/layers/asHarvested\">asHarvested</a></p>
        <p><a href=\"/layers/asApplied\">asApplied</a></p>
        </td></tr></table>
        <p><a href=\"/logout-redirect\">Log out</a></p>",
        first = user.firstname,
        last = user.lastname,
    )
}

pub fn field_page(field: &Field, boundary: Option<&Value>) -> String {
    let boundary_html = match boundary {
        Some(boundary) => format!("<p>Boundary info:<pre>{}</pre></p>", pretty(boundary)),
        None => "<p>No boundary recorded for this field.</p>".to_string(),
    };
    format!(
        "{TITLE}
        <h2>Field Name: {name}</h2>
        {boundary_html}
        <p><a href=\"/home\">Return home</a></p>",
        name = field.name,
    )
}

pub fn upload_form_page() -> String {
    format!(
        "{TITLE}
        <h2>Upload data</h2>
        <form method=post enctype=multipart/form-data>
        <p>Content type:<input type=text name=file_content_type /></p>
        <p><input type=file name=file /></p>
        <p><input type=submit value=Upload /></p>
        </form>
        <p><a href=\"/home\">Return home</a></p>"
    )
}

pub fn upload_result_page(upload_id: &str) -> String {
    format!(
        "{TITLE}
        <h2>Upload data</h2>
        <p>File uploaded: {upload_id}
        <a href=\"/upload/{upload_id}\">Get Status</a></p>
        <p><a href=\"/home\">Return home</a></p>"
    )
}

pub fn upload_status_page(upload_id: &str, status: &str) -> String {
    format!(
        "{TITLE}
        <h2>Upload ID: {upload_id}</h2>
        <p>Status: {status} <a href=\"#\" onclick=\"location.reload();\">Refresh</a></p>
        <p><a href=\"/home\">Return home</a></p>"
    )
}

pub fn observations_page(observations: &[Value]) -> String {
    let body = if observations.is_empty() {
        "<p>No Scouting Observations found!</p>".to_string()
    } else {
        format!(
            "<p>Your Climate Scouting Observations:{}</p>",
            render_ul(observations.iter().map(observation_link))
        )
    };
    format!(
        "{TITLE}
        {body}
        <p><a href=\"/home\">Return home</a></p>"
    )
}

pub fn observation_page(observation_id: &str, observation: &Value) -> String {
    format!(
        "{TITLE}
        <h2>Scouting Observation ID: {observation_id}</h2>
        <p><pre>{json}</pre></p>
        <p><a href=\"/scouting-observation/{observation_id}/attachments\">List attachments</a></p>
        <p><a href=\"/scouting-observations\">Return to Observations list</a></p>
        <p><a href=\"/home\">Return home</a></p>",
        json = pretty(observation),
    )
}

pub fn attachments_page(observation_id: &str, attachments: &[Value]) -> String {
    let body = if attachments.is_empty() {
        "<p>No attachments found!</p>".to_string()
    } else {
        format!(
            "<p>Your Climate Scouting Observations attachments:{}</p>",
            render_ul(attachments.iter().map(|a| attachment_entry(observation_id, a)))
        )
    };
    format!(
        "{TITLE}
        {body}
        <p><a href=\"/scouting-observation/{observation_id}\">Return to Observation:{observation_id}</a></p>
        <p><a href=\"/home\">Return home</a></p>"
    )
}

pub fn activities_page(activity: Activity, items: &[Value], next_token: Option<&str>) -> String {
    let body = if items.is_empty() {
        "<p>No data found!</p>".to_string()
    } else {
        format!(
            "<p>Your Climate {activity} activities:{}</p>",
            render_ul(items.iter().map(|item| activity_entry(activity, item)))
        )
    };
    let more_records = match next_token {
        Some(token) => format!(
            "<p><a href=\"/layers/{layer}?next_token={token}\">More records &gt;&gt;</a></p>",
            layer = activity.layer_name(),
        ),
        None => String::new(),
    };
    format!(
        "{TITLE}
        {body}
        {more_records}
        <p><a href=\"/home\">Return home</a></p>"
    )
}

pub fn error_page(error: &ApiError) -> String {
    format!(
        "{TITLE}
        <h2>Something went wrong</h2>
        <p>{code:?}: {message}</p>
        <p><a href=\"/home\">Return home</a></p>",
        code = error.code,
        message = error.message,
    )
}

fn render_ul(items: impl Iterator<Item = String>) -> String {
    let items: Vec<String> = items.map(|item| format!("<li>{item}</li>")).collect();
    format!("<ul>{}</ul>", items.join("\n"))
}

fn field_link(field: &Field) -> String {
    format!(
        "<a href=\"/field/{id}\">{name} ({id})</a>",
        id = field.id,
        name = field.name,
    )
}

fn observation_link(observation: &Value) -> String {
    let id = str_key(observation, "id");
    format!("<a href=\"/scouting-observation/{id}\">{id}</a>")
}

fn attachment_entry(observation_id: &str, attachment: &Value) -> String {
    let id = str_key(attachment, "id");
    let link = if str_key(attachment, "status") == "DELETED" {
        String::new()
    } else {
        let content_type = attachment
            .get("contentType")
            .and_then(Value::as_str)
            .unwrap_or("application/octet-stream");
        let length = attachment.get("length").and_then(Value::as_u64).unwrap_or(0);
        format!(
            ": <a href=\"/scouting-observation/{observation_id}/attachments/{id}?contentType={content_type}&length={length}\">Get contents</a>"
        )
    };
    format!(
        "<h2>{id}{link}</h2>
        <p><pre>{info}</pre></p>",
        info = pretty(attachment),
    )
}

fn activity_entry(activity: Activity, item: &Value) -> String {
    let id = str_key(item, "id");
    let length = item.get("length").and_then(Value::as_u64).unwrap_or(0);
    format!(
        "{id} : <a href=\"/layers/{layer}/{id}/contents?length={length}\">Get contents</a>
        <p><pre>{body}</pre></p>",
        layer = activity.layer_name(),
        body = pretty(item),
    )
}

fn str_key<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
