//! The shared fetch/support module
//!
//! Emitted at most once per generation run, only when some generated unit
//! has a unary or server-streaming method. Generated service classes
//! import it under the `fm` alias.

use crate::options::Options;

/// TypeScript source of the fetch module
const FETCH_MODULE_SOURCE: &str = r#"
export interface InitReq extends RequestInit {
  pathPrefix?: string
}

export function fetchReq<I, O>(path: string, init?: InitReq): Promise<O> {
  const {pathPrefix, ...req} = init || {}

  const url = pathPrefix ? `${pathPrefix}${path}` : path

  return fetch(url, req).then(r => r.json().then((body: O) => {
    if (!r.ok) { throw body; }
    return body;
  })) as Promise<O>
}

// NotifyStreamEntityArrival is a callback that will be called on streaming entity arrival
export type NotifyStreamEntityArrival<T> = (resp: T) => void

/**
 * fetchStreamingRequest is able to handle grpc-gateway server side streaming call
 * it reads the response as a new-line separated stream of JSON entities
 * and notifies the caller as each one arrives
 */
export async function fetchStreamingRequest<S, R>(path: string, callback?: NotifyStreamEntityArrival<R>, init?: InitReq) {
  const {pathPrefix, ...req} = init || {}
  const url = pathPrefix ? `${pathPrefix}${path}` : path
  const result = await fetch(url, req)
  if (!result.ok) {
    const resp = await result.json()
    const errMsg = resp.error && resp.error.message ? resp.error.message : ""
    throw new Error(errMsg)
  }
  if (!result.body) {
    throw new Error("response does not have a body")
  }

  const reader = result.body.getReader()
  const decoder = new TextDecoder()
  let buffer = ""
  while (true) {
    const {done, value} = await reader.read()
    if (done) break
    buffer += decoder.decode(value, {stream: true})
    const lines = buffer.split("\n")
    buffer = lines.pop() || ""
    for (const line of lines) {
      if (!line.trim()) continue
      const entity = JSON.parse(line)
      if (callback) {
        // the gateway wraps streamed entities in a result envelope
        callback(entity.result !== undefined ? entity.result : entity)
      }
    }
  }
}

/**
 * renderURLSearchParams renders the request object into query parameters,
 * skipping the fields that are already bound into the URL path
 */
export function renderURLSearchParams<T>(req: T, urlPathParams: string[] = []): string {
  const params = new URLSearchParams()
  for (const [key, value] of Object.entries(req as Record<string, unknown>)) {
    if (urlPathParams.includes(key) || value === undefined || value === null) continue
    if (Array.isArray(value)) {
      value.forEach(v => params.append(key, String(v)))
    } else {
      params.append(key, String(value))
    }
  }
  return params.toString()
}
"#;

/// Render the fetch module, with the same header as every generated file
pub fn fetch_module(options: &Options) -> String {
    let mut out = String::new();
    super::push_header(&mut out, options);
    out.push_str(FETCH_MODULE_SOURCE);
    out.trim().to_string()
}
