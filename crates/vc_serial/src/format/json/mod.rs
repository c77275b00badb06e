//! JSON-like text form.
//!
//! Member names become object keys. Engine metadata travels in `$`-prefixed
//! keys and literals that plain JSON tooling treats as ordinary data:
//!
//! | sentinel             | meaning                                     |
//! |----------------------|---------------------------------------------|
//! | `"$id": 3`           | internal id of a reference node             |
//! | `"$type": "0\|path"` | embedded type, declared with a session id   |
//! | `"$type": 0`         | embedded type, by an earlier session id     |
//! | `"$rlength"` / `"$rcontent"` | array length and entries            |
//! | `"$plength"` / `"$pcontent"` | primitive array length and elements |
//! | `$iref:3`            | internal reference                          |
//! | `$eref:3`            | external reference by index                 |
//! | `$guidref:<guid>`    | external reference by GUID                  |
//! | `{"$fstrref": "k"}`  | external reference by string key            |

mod reader;
mod token;
mod writer;


pub use reader::JsonDataReader;
pub use writer::JsonDataWriter;

const ID: &str = "$id";
const TYPE: &str = "$type";
const REGULAR_LENGTH: &str = "$rlength";
const REGULAR_CONTENT: &str = "$rcontent";
const PRIMITIVE_LENGTH: &str = "$plength";
const PRIMITIVE_CONTENT: &str = "$pcontent";
const STRING_REF: &str = "$fstrref";
