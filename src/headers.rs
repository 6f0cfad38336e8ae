use http_client::Request;

/// Desktop Chrome user agent presented to the scrape target
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

const SEC_CH_UA: &str =
    "\"Not)A;Brand\";v=\"8\", \"Chromium\";v=\"138\", \"Google Chrome\";v=\"138\"";
const SEC_CH_UA_MOBILE: &str = "?0";
const SEC_CH_UA_PLATFORM: &str = "\"Windows\"";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// Add the browser identity headers sent with every scrape request
pub fn add_browser_headers(request: &mut Request) {
    let _ = request.insert_header("User-Agent", USER_AGENT);
    let _ = request.insert_header("Accept-Language", "en-US,en;q=0.9");
    let _ = request.insert_header("DNT", "1");
    let _ = request.insert_header("Connection", "keep-alive");
    let _ = request.insert_header("sec-ch-ua", SEC_CH_UA);
    let _ = request.insert_header("sec-ch-ua-mobile", SEC_CH_UA_MOBILE);
    let _ = request.insert_header("sec-ch-ua-platform", SEC_CH_UA_PLATFORM);
}

/// Add headers for a page navigation or an XHR call
pub fn add_get_headers(request: &mut Request, is_ajax: bool, referer_url: Option<&str>) {
    if is_ajax {
        let _ = request.insert_header("Accept", "application/json, text/javascript, */*; q=0.01");
        let _ = request.insert_header("X-Requested-With", "XMLHttpRequest");
        let _ = request.insert_header("Sec-Fetch-Mode", "cors");
        let _ = request.insert_header("Sec-Fetch-Site", "same-origin");
    } else {
        let _ = request.insert_header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        );
        let _ = request.insert_header("Upgrade-Insecure-Requests", "1");
    }

    if let Some(referer) = referer_url {
        let _ = request.insert_header("Referer", referer);
    }
}

/// Add headers for a form-encoded POST
pub fn add_form_headers(request: &mut Request) {
    let _ = request.insert_header("Content-Type", FORM_CONTENT_TYPE);
}

/// Add headers for a JSON API call
pub fn add_json_headers(request: &mut Request) {
    let _ = request.insert_header("Accept", "application/json");
    let _ = request.insert_header("Content-Type", "application/json");
}

pub fn add_bearer(request: &mut Request, access_token: &str) {
    let _ = request.insert_header("Authorization", format!("Bearer {access_token}"));
}

/// Add cookies to a request if they exist
pub fn add_cookies(request: &mut Request, cookies: &[String]) {
    if !cookies.is_empty() {
        let cookie_header = cookies.join("; ");
        let _ = request.insert_header("Cookie", &cookie_header);
    }
}

/// Merge `Set-Cookie` headers into `cookies`, replacing values by name.
pub fn store_cookies(response: &http_types::Response, cookies: &mut Vec<String>) {
    let Some(values) = response.header("set-cookie") else {
        return;
    };

    for value in values {
        let pair = value.as_str().split(';').next().unwrap_or("").trim();
        let Some((name, _)) = pair.split_once('=') else {
            continue;
        };
        let prefix = format!("{name}=");
        cookies.retain(|existing| !existing.starts_with(&prefix));
        cookies.push(pair.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_types::{Method, Response, StatusCode, Url};

    #[test]
    fn test_store_cookies_replaces_by_name() {
        let mut cookies = vec!["guid=old".to_string(), "theme=dark".to_string()];
        let mut response = Response::new(StatusCode::Ok);
        response.append_header("set-cookie", "guid=new; Path=/; HttpOnly");
        response.append_header("set-cookie", "garbage");

        store_cookies(&response, &mut cookies);

        assert_eq!(cookies, vec!["theme=dark".to_string(), "guid=new".to_string()]);
    }

    #[test]
    fn test_ajax_headers_mark_xhr() {
        let url = Url::parse("https://example.com/ajax").unwrap();
        let mut request = Request::new(Method::Get, url);
        add_browser_headers(&mut request);
        add_get_headers(&mut request, true, Some("https://example.com/"));

        assert_eq!(
            request.header("X-Requested-With").map(|h| h.last().as_str()),
            Some("XMLHttpRequest")
        );
        assert_eq!(
            request.header("Referer").map(|h| h.last().as_str()),
            Some("https://example.com/")
        );
        assert!(request.header("User-Agent").is_some());
    }
}
