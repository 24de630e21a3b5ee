pub enum Term {
    Constant(String),
    Variable(String),
}

impl Term {
    pub fn constant(name: impl Into<String>) -> Self {
        Term::Constant(name.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        Term::Variable(name.into())
    }
}

// functor(t1, ..., tn)
pub struct Literal {
    pub functor: String,
    pub args: Vec<Term>,
}

impl Literal {
    pub fn new(functor: impl Into<String>, args: Vec<Term>) -> Self {
        Literal {
            functor: functor.into(),
            args,
        }
    }
}

// head :- body {features}
pub struct Rule {
    pub head: Literal,
    pub body: Vec<Literal>,
    pub features: Vec<Literal>,
}

impl Rule {
    pub fn new(head: Literal, body: Vec<Literal>) -> Self {
        Rule {
            head,
            body,
            features: Vec::new(),
        }
    }

    pub fn fact(head: Literal) -> Self {
        Self::new(head, Vec::new())
    }

    pub fn with_features(mut self, features: Vec<Literal>) -> Self {
        self.features = features;
        self
    }
}
