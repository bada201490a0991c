use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::{error::FormatError, resolver::ResourceResolver};

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Scheme<'a> {
    // Data uri with optional mime type
    Data(Option<&'a str>, Vec<u8>),
    // Relative path, percent-decoded
    Relative(String),
    // Absolute path, percent-decoded
    Absolute(String),
    // Anything the core does not fetch by itself, like http
    Unsupported(&'a str),
}

fn starts_with_ignore_case(uri: &str, prefix: &str) -> bool {
    uri.len() >= prefix.len() && uri.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

fn percent_decode(input: &str) -> String {
    fn hex(digit: u8) -> Option<u8> {
        match digit {
            b'0'..=b'9' => Some(digit - b'0'),
            b'a'..=b'f' => Some(digit - b'a' + 10),
            b'A'..=b'F' => Some(digit - b'A' + 10),
            _ => None,
        }
    }

    let bytes = input.as_bytes();
    let mut output = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' && index + 2 < bytes.len() {
            if let (Some(high), Some(low)) = (hex(bytes[index + 1]), hex(bytes[index + 2])) {
                output.push(high << 4 | low);
                index += 3;
                continue;
            }
        }
        output.push(bytes[index]);
        index += 1;
    }
    String::from_utf8_lossy(&output).into_owned()
}

impl<'a> TryFrom<&'a str> for Scheme<'a> {
    type Error = FormatError;

    fn try_from(uri: &'a str) -> Result<Self, Self::Error> {
        if starts_with_ignore_case(uri, "data:") {
            // Data URI: rfc2397
            let content = &uri[5..];
            let Some((param, value)) = content.split_once(',') else {
                return Err(FormatError::BadDataUri(uri.to_string()));
            };
            if let Some((mime, encoding)) = param.rsplit_once(';') {
                if encoding.eq_ignore_ascii_case("base64") {
                    let data = STANDARD
                        .decode(value)
                        .map_err(|_| FormatError::BadDataUri(uri.to_string()))?;
                    let mime = (!mime.is_empty()).then_some(mime);
                    Ok(Scheme::Data(mime, data))
                } else {
                    Err(FormatError::BadDataUri(uri.to_string()))
                }
            } else {
                let mime = (!param.is_empty()).then_some(param);
                Ok(Scheme::Data(mime, percent_decode(value).into_bytes()))
            }
        } else if starts_with_ignore_case(uri, "file://") {
            Ok(Scheme::Absolute(percent_decode(&uri[7..])))
        } else if starts_with_ignore_case(uri, "file:") {
            Ok(Scheme::Absolute(percent_decode(&uri[5..])))
        } else if uri.contains(':') && !uri.starts_with('/') {
            Ok(Scheme::Unsupported(uri))
        } else {
            Ok(Scheme::Relative(percent_decode(uri)))
        }
    }
}

pub(crate) type SchemeData<'a> = (Option<&'a str>, Vec<u8>);

impl<'a> Scheme<'a> {
    /// Fetch the bytes behind this URI. `Ok(None)` means the resolver does not
    /// know the resource.
    pub(crate) fn load<R: ResourceResolver + ?Sized>(
        self,
        resolver: &R,
    ) -> Result<Option<SchemeData<'a>>, std::io::Error> {
        match self {
            Scheme::Data(mime, data) => Ok(Some((mime, data))),
            Scheme::Relative(path) => Ok(resolver.resolve(Path::new(&path))?.map(|data| (None, data))),
            Scheme::Absolute(path) => Ok(resolver
                .resolve(&PathBuf::from(path))?
                .map(|data| (None, data))),
            Scheme::Unsupported(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Scheme;
    use crate::error::FormatError;

    #[test]
    fn base64_data_uri() {
        let scheme = Scheme::try_from("data:application/octet-stream;base64,AAECAw==").unwrap();
        assert_eq!(
            scheme,
            Scheme::Data(Some("application/octet-stream"), vec![0, 1, 2, 3])
        );
    }

    #[test]
    fn data_uri_without_mime() {
        let scheme = Scheme::try_from("data:;base64,/w==").unwrap();
        assert_eq!(scheme, Scheme::Data(None, vec![255]));
    }

    #[test]
    fn plain_data_uri() {
        let scheme = Scheme::try_from("data:,a%20b").unwrap();
        assert_eq!(scheme, Scheme::Data(None, b"a b".to_vec()));
    }

    #[test]
    fn bad_data_uri() {
        assert!(matches!(
            Scheme::try_from("data:application/octet-stream;base64"),
            Err(FormatError::BadDataUri(_))
        ));
        assert!(matches!(
            Scheme::try_from("data:application/octet-stream;base64,@@@"),
            Err(FormatError::BadDataUri(_))
        ));
        assert!(matches!(
            Scheme::try_from("data:text/plain;charset=utf-8,abc"),
            Err(FormatError::BadDataUri(_))
        ));
    }

    #[test]
    fn paths() {
        assert_eq!(
            Scheme::try_from("buffers/my%20mesh.bin").unwrap(),
            Scheme::Relative(String::from("buffers/my mesh.bin"))
        );
        assert_eq!(
            Scheme::try_from("file:///tmp/a.bin").unwrap(),
            Scheme::Absolute(String::from("/tmp/a.bin"))
        );
        assert_eq!(
            Scheme::try_from("https://example.com/a.bin").unwrap(),
            Scheme::Unsupported("https://example.com/a.bin")
        );
        assert_eq!(
            Scheme::try_from("100%").unwrap(),
            Scheme::Relative(String::from("100%"))
        );
    }
}
