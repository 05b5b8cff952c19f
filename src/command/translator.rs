use url::Url;

use crate::command::lexer;
use crate::command::{
    BasicAuth, Body, ConversionError, Cookie, FormField, Header, Method, ParsedRequest, QueryParam,
};

const CURL_CMD: &str = "curl";

/// Value-taking flags the translator does not map onto the request. Their
/// argument must still be consumed so it is never mistaken for the URL.
const SKIPPED_VALUE_FLAGS: &[&str] = &[
    "-o",
    "--output",
    "-m",
    "--max-time",
    "--connect-timeout",
    "--retry",
    "-w",
    "--write-out",
    "--cacert",
    "--capath",
];

/// Cheap invocation-token check, case-sensitive per the `curl` binary name.
pub fn is_curl(input: &str) -> bool {
    input.trim_start().starts_with(CURL_CMD)
}

/// Translates a full cURL command line into a [`ParsedRequest`].
///
/// Pure and stateless: no I/O, no retained state, identical input yields
/// identical output. Recognized flags map onto the request; unrecognized
/// flags are skipped rather than rejected, so real-world command variants
/// still translate. The first token that is neither a flag nor a consumed
/// flag argument becomes the target URL.
pub fn translate(input: &str) -> Result<ParsedRequest, ConversionError> {
    let tokens = lexer::tokenize(input)?;
    if tokens.first().map(String::as_str) != Some(CURL_CMD) {
        return Err(ConversionError::MalformedInput(
            "command must start with the curl invocation token".to_string(),
        ));
    }

    let mut method: Option<Method> = None;
    let mut url: Option<String> = None;
    let mut headers: Vec<Header> = Vec::new();
    let mut data_parts: Vec<String> = Vec::new();
    let mut form_fields: Vec<FormField> = Vec::new();
    let mut raw_body_last = false;
    let mut auth: Option<BasicAuth> = None;
    let mut cookies: Vec<Cookie> = Vec::new();
    let mut follow_redirects = false;
    let mut insecure = false;

    let mut i = 1;
    while i < tokens.len() {
        let token = &tokens[i];
        i += 1;
        let (flag, inline) = split_flag(token);
        match flag {
            "-X" | "--request" => {
                method = Some(flag_value(flag, inline, &tokens, &mut i)?.parse()?);
            }
            "-H" | "--header" => {
                let value = flag_value(flag, inline, &tokens, &mut i)?;
                if let Some(header) = parse_header(&value) {
                    headers.push(header);
                }
            }
            "-d" | "--data" | "--data-raw" | "--data-binary" | "--data-urlencode" => {
                data_parts.push(flag_value(flag, inline, &tokens, &mut i)?);
                raw_body_last = true;
            }
            "-F" | "--form" => {
                let value = flag_value(flag, inline, &tokens, &mut i)?;
                form_fields.push(parse_form_field(&value)?);
                raw_body_last = false;
            }
            "-u" | "--user" => {
                auth = Some(parse_auth(&flag_value(flag, inline, &tokens, &mut i)?));
            }
            "-b" | "--cookie" => {
                cookies.extend(parse_cookies(&flag_value(flag, inline, &tokens, &mut i)?));
            }
            "-A" | "--user-agent" => {
                let value = flag_value(flag, inline, &tokens, &mut i)?;
                headers.push(Header::new("User-Agent", value));
            }
            "-e" | "--referer" => {
                let value = flag_value(flag, inline, &tokens, &mut i)?;
                headers.push(Header::new("Referer", value));
            }
            "--url" => {
                url = Some(flag_value(flag, inline, &tokens, &mut i)?);
            }
            "-L" | "--location" => follow_redirects = true,
            "-k" | "--insecure" => insecure = true,
            f if SKIPPED_VALUE_FLAGS.contains(&f) => {
                if inline.is_none() {
                    i += 1;
                }
            }
            // Lenient-superset policy: any other flag is skipped alone.
            f if f.len() > 1 && f.starts_with('-') => {}
            _ => {
                if url.is_none() {
                    url = Some(token.clone());
                }
            }
        }
    }

    let url = url.ok_or_else(|| {
        ConversionError::MalformedInput("no target url found in command".to_string())
    })?;
    let parsed_url = Url::parse(&url).map_err(|err| {
        ConversionError::MalformedInput(format!("invalid target url {url:?}: {err}"))
    })?;
    let query = parsed_url
        .query_pairs()
        .map(|(name, value)| QueryParam {
            name: name.into_owned(),
            value: value.into_owned(),
        })
        .collect();

    let body = if raw_body_last {
        Some(Body::Raw {
            content: data_parts.join("&"),
        })
    } else if form_fields.is_empty() {
        None
    } else {
        Some(Body::Form {
            fields: form_fields,
        })
    };
    let method = method.unwrap_or(if body.is_some() {
        Method::Post
    } else {
        Method::Get
    });

    Ok(ParsedRequest {
        method,
        url,
        headers,
        query,
        body,
        auth,
        cookies,
        follow_redirects,
        insecure,
    })
}

/// Splits `--flag=value` long options; short options never carry `=` values.
fn split_flag(token: &str) -> (&str, Option<&str>) {
    if token.starts_with("--") {
        match token.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (token, None),
        }
    } else {
        (token, None)
    }
}

/// Resolves a flag's value from its inline `=` part or the next token.
fn flag_value(
    flag: &str,
    inline: Option<&str>,
    tokens: &[String],
    i: &mut usize,
) -> Result<String, ConversionError> {
    if let Some(value) = inline {
        return Ok(value.to_string());
    }
    let Some(value) = tokens.get(*i) else {
        return Err(ConversionError::MalformedInput(format!(
            "flag {flag} requires a value"
        )));
    };
    *i += 1;
    Ok(value.clone())
}

/// `Name: value` header split. Headers with no colon are skipped, matching
/// curl's warn-and-continue behavior.
fn parse_header(value: &str) -> Option<Header> {
    let (name, value) = value.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(Header::new(name, value.trim_start()))
}

fn parse_form_field(value: &str) -> Result<FormField, ConversionError> {
    let Some((name, value)) = value.split_once('=') else {
        return Err(ConversionError::MalformedInput(format!(
            "form field {value:?} is missing '='"
        )));
    };
    Ok(FormField {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn parse_auth(value: &str) -> BasicAuth {
    match value.split_once(':') {
        Some((username, password)) => BasicAuth {
            username: username.to_string(),
            password: Some(password.to_string()),
        },
        None => BasicAuth {
            username: value.to_string(),
            password: None,
        },
    }
}

fn parse_cookies(value: &str) -> Vec<Cookie> {
    value
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .map(|(name, value)| Cookie {
            name: name.to_string(),
            value: value.to_string(),
        })
        .collect()
}
