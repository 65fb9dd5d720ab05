//! Canned replies for when the completion endpoint is unreachable.
//!
//! [`REPLIES`] is evaluated top to bottom and the first matching row wins. The
//! last row matches everything, so [`canned_reply`] always has an answer.

/// Terms that mark a message as a programming question.
const PROGRAMMING_TERMS: &[&str] = &[
    "python",
    "javascript",
    "java",
    "c++",
    "react",
    "node",
    "html",
    "css",
    "function",
    "method",
    "class",
    "variable",
    "array",
    "object",
    "string",
    "code",
    "programming",
    "syntax",
    "algorithm",
    "debug",
    "error",
    "bug",
];

const CAPABILITIES: &str = "💻 Explaining and reviewing code
🐛 Diagnosing and fixing errors
⚡ Performance optimization
🔧 Help implementing new features
❓ Answering programming questions";

/// One row of the reply table. `applies` sees the lower-cased message and
/// `render` the message as the user wrote it.
pub struct CannedReply {
    pub topic: &'static str,
    pub applies: fn(&str) -> bool,
    pub render: fn(&str) -> String,
}

pub static REPLIES: &[CannedReply] = &[
    CannedReply {
        topic: "python",
        applies: |m| {
            mentions_programming(m)
                && m.contains("python")
                && ["what is", "explain", "について"].iter().any(|q| m.contains(q))
        },
        render: |_| PYTHON_REPLY.to_string(),
    },
    CannedReply {
        topic: "javascript",
        applies: |m| mentions_programming(m) && (m.contains("javascript") || has_word(m, "js")),
        render: |_| JAVASCRIPT_REPLY.to_string(),
    },
    CannedReply {
        topic: "greeting",
        applies: |m| {
            mentions_programming(m)
                && (["hello", "hi", "hey", "help"].iter().any(|w| has_word(m, w))
                    || ["こんにちは", "はじめまして", "ヘルプ"].iter().any(|k| m.contains(k)))
        },
        render: |_| GREETING_REPLY.to_string(),
    },
    CannedReply {
        topic: "optimization",
        applies: |m| {
            mentions_programming(m)
                && [
                    "optimiz",
                    "performance",
                    "speed",
                    "faster",
                    "最適化",
                    "パフォーマンス",
                    "高速",
                ].iter().any(|k| m.contains(k))
        },
        render: |_| OPTIMIZATION_REPLY.to_string(),
    },
    CannedReply {
        topic: "debugging",
        applies: |m| {
            mentions_programming(m)
                && [
                    "error", "bug", "debug", "fix", "crash", "エラー", "バグ", "修正", "解決",
                ].iter().any(|k| m.contains(k))
        },
        render: |_| DEBUGGING_REPLY.to_string(),
    },
    CannedReply {
        topic: "programming",
        applies: mentions_programming,
        render: |_| PROGRAMMING_REPLY.to_string(),
    },
    CannedReply {
        topic: "other",
        applies: |_| true,
        render: |message| {
            format!(
                "🤖 You asked about \"{message}\".\n\n\
                 I'm an assistant that specializes in programming. I can help with:\n\
                 {CAPABILITIES}\n\n\
                 Ask me anything about code and I'll dig in!"
            )
        },
    },
];

pub fn mentions_programming(lower: &str) -> bool {
    PROGRAMMING_TERMS.iter().any(|term| lower.contains(term))
}

fn has_word(lower: &str, word: &str) -> bool {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}

/// The first row matching `message`.
pub fn select(message: &str) -> &'static CannedReply {
    let lower = message.to_lowercase();
    REPLIES
        .iter()
        .find(|row| (row.applies)(&lower))
        .unwrap_or(&REPLIES[REPLIES.len() - 1])
}

/// Reply of the first row matching `message`.
pub fn canned_reply(message: &str) -> String {
    (select(message).render)(message)
}

const PYTHON_REPLY: &str = "💻 Python is a programming language with a simple, readable syntax.

*Highlights:*
- Easy for beginners to pick up
- Used for web development, data analysis, AI/ML and automation
- A rich ecosystem of libraries and frameworks

*A quick example:*

```python
# Hello World
print(\"Hello, World!\")

# Variables and functions
def greet(name):
    return f\"Hello, {name}!\"

message = greet(\"Python\")
print(message)
```

If you have a specific Python question, just ask!";

const JAVASCRIPT_REPLY: &str = "💻 JavaScript is the programming language of the web browser.

*Where it is used:*
- Interactive behaviour in web pages
- Server-side development with Node.js
- Mobile apps with React Native

*A quick example:*

```javascript
// Define a function
function greet(name) {
    return `Hello, ${name}!`;
}

// React to a click
document.getElementById(\"myButton\").addEventListener(\"click\", function() {
    alert(\"The button was clicked!\");
});
```

Send me a specific JavaScript question and I'll explain it in detail!";

const GREETING_REPLY: &str = "👋 Hi! I'm an assistant that specializes in code.

*What I can help with:*
💻 Explaining and reviewing code
🐛 Diagnosing and fixing errors
⚡ Performance optimization
🔧 Help implementing new features
❓ Answering programming questions

Let me know what you're working on!";

const OPTIMIZATION_REPLY: &str = "⚡ Happy to help you optimize your code!

*Things worth looking at:*
- Algorithmic complexity
- Memory usage
- Choice of data structures
- Caching

Share the code you want to speed up and I'll suggest concrete improvements.";

const DEBUGGING_REPLY: &str = "🐛 Let's track down that error!

*These details help with troubleshooting:*
1. The full error message
2. The code that triggers it
3. What you expected to happen
4. What actually happens

Share the code and the error message and I'll suggest a cause and a fix.";

const PROGRAMMING_REPLY: &str = "💻 Sounds like a programming question!

I can help with explanations, debugging, optimization and more.

*What I can do:*
- Explain code and suggest improvements
- Find bugs and show how to fix them
- Recommend best practices
- Walk through algorithms

Paste your code and I'll take a closer look.";
