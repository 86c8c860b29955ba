
use std::io::Error;
use std::collections::HashMap;
use std::fmt;
use log::debug;
use std::thread_local;
use std::cell::RefCell;

thread_local ! {
    /// URL-to-body map for internet mock
    pub static HTML_MAP : RefCell<HashMap<Box<str>, String>> = RefCell::new ( HashMap::<Box<str>, String>::new ( ) );
}

pub struct Client {
}

impl Default for Client {
    fn default ( ) -> Self {
        Client {
        }
    }
}

impl Client {
    pub fn new ( ) -> Self {
        debug ! ( "reqwest_mock::Client::new()" );
        Client::default ( )
    }

    pub fn get ( self, url: &str ) -> RequestBuilder {
        debug ! ( "reqwest_mock::Client.get({})", url );
        RequestBuilder {
            url: url.to_string ( ),
        }
    }
}

pub struct RequestBuilder {
    url: String,
}

impl RequestBuilder {
    pub fn header ( self, _key: &str, _value: &str ) -> Self {
        debug ! ( "reqwest_mock::RequestBuilder.header()" );
        self
    }

    pub fn send ( self ) -> Result<Response, Error> {
        debug ! ( "reqwest_mock::RequestBuilder.send()" );
        HTML_MAP.with ( |static_html_map| {
            let html_map = static_html_map.borrow ( );
            if let Some ( result ) = html_map.get ( self.url.as_str ( ) ) {
                debug ! ( "reqwest_mock::RequestBuilder.send(): Found URL: {}", self.url );
                Ok ( Response {
                    result: result.to_string ( ),
                } )
            } else if let Some ( result ) = html_map.get ( "" ) {
                // default
                debug ! ( "reqwest_mock::RequestBuilder.send(): Not found URL: {}. Default return used", self.url );
                Ok ( Response {
                    result: result.to_string ( ),
                } )
            } else {
                Err ( Error::new ( std::io::ErrorKind::Other, format ! ( "Mock 404: {}", self.url ) ) )
            }
        } )
    }
}

pub struct Response {
    result: String,
}

impl Response {
    pub fn status ( &self ) -> StatusCode {
        // mapped URLs always answer 200; unavailability is modelled by send()
        StatusCode { }
    }

    pub fn text_with_charset ( self, _charset: &str ) -> Result<String, Error> {
        debug ! ( "reqwest_mock::Response.text_with_charset(): {}[...]", self.result.get ( ..64 ).unwrap_or ( self.result.as_str ( ) ) );
        Ok ( self.result )
    }
}

pub struct StatusCode { }

impl StatusCode {
    pub fn is_success ( &self ) -> bool {
        true
    }
}

impl fmt::Display for StatusCode {
    fn fmt ( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        write ! ( f, "200 OK" )
    }
}
