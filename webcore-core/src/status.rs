// HTTP status codes known to endpoints and status pages

macro_rules! statuses {
    ($($variant:ident = $code:literal, $reason:literal;)*) => {
        /// HTTP status codes used by endpoint families and status pages
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum HttpStatus {
            $($variant = $code,)*
        }

        impl HttpStatus {
            pub const ALL: &'static [HttpStatus] = &[$(HttpStatus::$variant),*];

            /// Canonical reason phrase
            pub fn reason(&self) -> &'static str {
                match self {
                    $(HttpStatus::$variant => $reason,)*
                }
            }

            pub fn from_code(code: u16) -> Option<Self> {
                match code {
                    $($code => Some(HttpStatus::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

statuses! {
    Ok = 200, "OK";
    Created = 201, "Created";
    Accepted = 202, "Accepted";
    NoContent = 204, "No Content";
    MovedPermanently = 301, "Moved Permanently";
    Found = 302, "Found";
    NotModified = 304, "Not Modified";
    BadRequest = 400, "Bad Request";
    Unauthorized = 401, "Unauthorized";
    Forbidden = 403, "Forbidden";
    NotFound = 404, "Not Found";
    MethodNotAllowed = 405, "Method Not Allowed";
    NotAcceptable = 406, "Not Acceptable";
    Conflict = 409, "Conflict";
    Gone = 410, "Gone";
    UnsupportedMediaType = 415, "Unsupported Media Type";
    UnprocessableEntity = 422, "Unprocessable Entity";
    InternalServerError = 500, "Internal Server Error";
    NotImplemented = 501, "Not Implemented";
    BadGateway = 502, "Bad Gateway";
    ServiceUnavailable = 503, "Service Unavailable";
}

impl HttpStatus {
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// The hundreds digit: 2 for success, 4 for client errors and so on
    pub fn class(&self) -> u16 {
        self.code() / 100
    }

    pub fn is_success(&self) -> bool {
        self.class() == 2
    }

    pub fn is_redirection(&self) -> bool {
        self.class() == 3
    }

    pub fn is_client_error(&self) -> bool {
        self.class() == 4
    }

    pub fn is_server_error(&self) -> bool {
        self.class() == 5
    }

    /// Whether a status page may answer with this status
    pub fn is_error(&self) -> bool {
        self.class() >= 4
    }
}

impl std::fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_status_maps_back_from_its_code() {
        for status in HttpStatus::ALL {
            assert_eq!(HttpStatus::from_code(status.code()), Some(*status));
        }
        assert_eq!(HttpStatus::from_code(299), None);
        assert_eq!(HttpStatus::from_code(418), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(HttpStatus::NotFound.to_string(), "404 Not Found");
        assert_eq!(HttpStatus::InternalServerError.to_string(), "500 Internal Server Error");
    }

    #[test]
    fn test_classes() {
        assert!(HttpStatus::NoContent.is_success());
        assert!(HttpStatus::Found.is_redirection());
        assert!(HttpStatus::Gone.is_client_error());
        assert!(HttpStatus::BadGateway.is_server_error());
        assert!(HttpStatus::MethodNotAllowed.is_error());
        assert!(!HttpStatus::Ok.is_error());
    }
}
