//! In-page response interception for WebDriver sessions.
//!
//! WebDriver cannot observe network traffic, so the page is taught to record it:
//! `fetch` and `XMLHttpRequest` are wrapped and every completed response is pushed
//! onto a bounded queue on `window`. The harvester drains the queue on each poll.
//! Navigation wipes the hook; [`DRAIN_SCRIPT`] reports that by returning `null`.

use crate::capture::RawResponse;
use serde_json::Value;

/// Installs the hook. Returns `true` if it was already present.
pub const INSTALL_SCRIPT: &str = r#"
return (function () {
    if (window.__menuHarvestInstalled) {
        return true;
    }
    window.__menuHarvestInstalled = true;
    window.__menuHarvestQueue = window.__menuHarvestQueue || [];
    var LIMIT = 500;

    function record(entry) {
        var queue = window.__menuHarvestQueue;
        queue.push(entry);
        if (queue.length > LIMIT) {
            queue.shift();
        }
    }

    var originalFetch = window.fetch;
    if (originalFetch) {
        window.fetch = function (input, init) {
            var method = (init && init.method) || (input && input.method) || 'GET';
            var url = typeof input === 'string' ? input : (input && input.url) || String(input);
            return originalFetch.apply(this, arguments).then(function (response) {
                try {
                    response.clone().text().then(function (body) {
                        record({
                            url: response.url || url,
                            method: String(method).toUpperCase(),
                            status: response.status,
                            body: body
                        });
                    }, function () {});
                } catch (e) {}
                return response;
            });
        };
    }

    var originalOpen = XMLHttpRequest.prototype.open;
    var originalSend = XMLHttpRequest.prototype.send;
    XMLHttpRequest.prototype.open = function (method, url) {
        this.__menuHarvestMeta = { method: String(method).toUpperCase(), url: String(url) };
        return originalOpen.apply(this, arguments);
    };
    XMLHttpRequest.prototype.send = function () {
        var xhr = this;
        xhr.addEventListener('loadend', function () {
            var meta = xhr.__menuHarvestMeta || { method: 'GET', url: xhr.responseURL };
            var body = null;
            try {
                body = (xhr.responseType === '' || xhr.responseType === 'text')
                    ? xhr.responseText
                    : JSON.stringify(xhr.response);
            } catch (e) {}
            record({
                url: xhr.responseURL || meta.url,
                method: meta.method,
                status: xhr.status,
                body: body
            });
        });
        return originalSend.apply(this, arguments);
    };
    return false;
})();
"#;

/// Takes everything queued so far, or `null` when the hook is gone.
pub const DRAIN_SCRIPT: &str = r#"
if (!window.__menuHarvestInstalled) {
    return null;
}
return window.__menuHarvestQueue.splice(0);
"#;

/// Interpret the value returned by [`DRAIN_SCRIPT`].
///
/// `None` means the hook needs reinstalling. Entries that do not look like a
/// response are dropped rather than failing the whole batch.
pub fn parse_drained(value: Value) -> Option<Vec<RawResponse>> {
    match value {
        Value::Null => None,
        Value::Array(entries) => Some(
            entries
                .into_iter()
                .filter_map(|entry| match serde_json::from_value(entry) {
                    Ok(raw) => Some(raw),
                    Err(e) => {
                        ::log::debug!("Dropping unreadable captured entry: {}", e);
                        None
                    }
                })
                .collect(),
        ),
        other => {
            ::log::debug!("Unexpected drain result: {}", other);
            Some(Vec::new())
        }
    }
}
